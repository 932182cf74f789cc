//! Shared domain types for the trade core
//!
//! 订单 / 库存 / 促销的领域模型与请求类型，供 trade-core 及其调用方使用。
//! DB 行类型通过 `db` feature 挂载 sqlx derive，纯类型消费方无需引入 sqlx。

pub mod models;
pub mod request;
pub mod util;

pub use request::{Actor, OrderLine, PlaceOrderRequest};
