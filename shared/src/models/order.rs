//! 订单模型与状态机类型

use serde::{Deserialize, Serialize};

// ==================== 订单状态 ====================

/// 订单履约状态
///
/// 合法迁移：
/// ```text
/// PENDING_PAYMENT --(支付)--> PENDING_SHIPMENT --(发货)--> SHIPPED --(完结)--> COMPLETED
///        |
///        +--(取消/超时)--> CANCELLED
/// ```
///
/// CANCELLED 只能从 PENDING_PAYMENT 进入，发货后不可取消。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum OrderStatus {
    /// 待支付
    #[cfg_attr(feature = "db", sqlx(rename = "PENDING_PAYMENT"))]
    PendingPayment,
    /// 待发货（已支付）
    #[cfg_attr(feature = "db", sqlx(rename = "PENDING_SHIPMENT"))]
    PendingShipment,
    /// 已发货
    #[cfg_attr(feature = "db", sqlx(rename = "SHIPPED"))]
    Shipped,
    /// 已完成（终态）
    #[cfg_attr(feature = "db", sqlx(rename = "COMPLETED"))]
    Completed,
    /// 已取消（终态）
    #[cfg_attr(feature = "db", sqlx(rename = "CANCELLED"))]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "PENDING_PAYMENT",
            OrderStatus::PendingShipment => "PENDING_SHIPMENT",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// 终态订单不再参与任何迁移
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== 支付状态 ====================

/// 支付状态（独立于履约状态的一条轴）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum PaymentStatus {
    /// 未支付
    #[cfg_attr(feature = "db", sqlx(rename = "UNPAID"))]
    Unpaid,
    /// 已支付
    #[cfg_attr(feature = "db", sqlx(rename = "PAID"))]
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== 订单 ====================

/// 订单主记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// 业务订单号（对外展示，ORD + 日期 + 序号）
    pub order_no: String,
    pub user_id: i64,
    pub address_id: i64,
    /// 商品小计（折扣前）
    pub subtotal: f64,
    /// 命中的促销规则 ID
    pub promotion_id: Option<i64>,
    /// 折扣金额
    pub discount_amount: f64,
    /// 应付金额 = subtotal - discount_amount
    pub pay_amount: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// 支付凭证号（支付成功后写入）
    pub payment_ref: Option<String>,
    /// 物流单号（发货后写入）
    pub tracking_no: Option<String>,
    pub remark: Option<String>,
    /// 支付时间（毫秒）
    pub pay_time: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    /// 是否允许取消：仅待支付且未付款的订单
    pub fn can_cancel(&self) -> bool {
        self.status == OrderStatus::PendingPayment && self.payment_status == PaymentStatus::Unpaid
    }

    /// 是否允许确认支付
    pub fn can_pay(&self) -> bool {
        self.status == OrderStatus::PendingPayment && self.payment_status == PaymentStatus::Unpaid
    }

    /// 是否允许发货：已支付且处于待发货
    pub fn can_ship(&self) -> bool {
        self.status == OrderStatus::PendingShipment && self.payment_status == PaymentStatus::Paid
    }
}

// ==================== 订单明细 ====================

/// 订单行项目
///
/// `sku_name` 与 `unit_price` 是下单时刻的快照，SKU 后续改价改名不影响已生成的订单。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub sku_id: i64,
    /// 商品名快照
    pub sku_name: String,
    pub quantity: i64,
    /// 成交单价快照
    pub unit_price: f64,
    /// 行小计 = unit_price * quantity
    pub line_total: f64,
    pub created_at: i64,
}

/// 订单 + 明细的聚合视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
