//! 核心模块 - 配置、状态和错误定义
//!
//! # 模块结构
//!
//! - [`Config`] - 服务配置
//! - [`ServerState`] - 服务状态
//! - [`TradeError`] - 统一错误类型

pub mod config;
pub mod error;
pub mod state;

pub use config::Config;
pub use error::{TradeError, TradeResult};
pub use state::ServerState;
