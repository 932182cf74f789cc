//! 库存模块
//!
//! 双计数器库存（物理 / 预占）与 append-only 流水。

pub mod ledger;

pub use ledger::{adjust_stock, consume, logs_for_order, logs_for_sku, release, reserve};
