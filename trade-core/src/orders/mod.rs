//! 订单模块
//!
//! 下单 / 支付 / 发货 / 取消的编排层，金额计算在 `money`。

pub mod money;
pub mod service;

pub use service::OrderService;
