//! SKU（库存单品）模型

use serde::{Deserialize, Serialize};

/// SKU 记录
///
/// 库存由两个计数器组成：
/// - `stock`: 物理库存（实际在库数量）
/// - `locked_stock`: 已被未支付订单预占的数量
///
/// 可售数量 = stock - locked_stock。下单只动 locked_stock，
/// 支付成功时两者同时扣减，取消 / 超时只回退 locked_stock。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Sku {
    pub id: i64,
    /// 商品编码（唯一）
    pub sku_code: String,
    pub name: String,
    /// 标价
    pub price: f64,
    /// 促销价（设置后优先于标价）
    pub promotion_price: Option<f64>,
    /// 物理库存
    pub stock: i64,
    /// 预占库存
    pub locked_stock: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Sku {
    /// 当前生效售价：促销价优先，否则标价
    pub fn selling_price(&self) -> f64 {
        self.promotion_price.unwrap_or(self.price)
    }

    /// 可售数量（物理库存减去预占）
    pub fn available(&self) -> i64 {
        self.stock - self.locked_stock
    }
}

/// 创建 SKU 的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuCreate {
    pub sku_code: String,
    pub name: String,
    pub price: f64,
    pub promotion_price: Option<f64>,
    /// 初始物理库存
    pub stock: i64,
}
