//! 促销模块
//!
//! 规则存取在 `db::repository::promotion`，命中与折扣计算在 `resolver`。

pub mod resolver;

pub use resolver::{best_rule, discount_for, is_rule_active, resolve};
