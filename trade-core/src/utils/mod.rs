//! 工具模块 - 通用工具函数
//!
//! # 内容
//!
//! - [`logger`] - 日志初始化
//! - [`validation`] - 文本长度限制与校验

pub mod logger;
pub mod validation;

pub use logger::{init_logger, init_logger_with_file};
