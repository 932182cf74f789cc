//! 领域模型定义

pub mod order;
pub mod promotion;
pub mod sku;
pub mod stock_log;

pub use order::*;
pub use promotion::*;
pub use sku::*;
pub use stock_log::*;
