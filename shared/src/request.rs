//! 对外请求类型与操作者标识

use serde::{Deserialize, Serialize};

// ==================== 下单请求 ====================

/// 下单请求中的一行商品
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku_id: i64,
    pub quantity: i64,
}

/// 下单请求
///
/// 同一请求内的多行商品要么全部预占成功，要么整单失败，不会部分锁定。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: i64,
    pub address_id: i64,
    pub lines: Vec<OrderLine>,
    pub remark: Option<String>,
}

// ==================== 操作者 ====================

/// 库存 / 订单变更的操作者，落入流水的 actor 字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Actor {
    /// 买家
    User { id: i64 },
    /// 运营人员
    Operator { name: String },
    /// 后台任务（超时清理等）
    System,
}

impl Actor {
    /// 流水落库用的文本标识
    pub fn label(&self) -> String {
        match self {
            Actor::User { id } => format!("user:{id}"),
            Actor::Operator { name } => format!("operator:{name}"),
            Actor::System => "system".to_string(),
        }
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
