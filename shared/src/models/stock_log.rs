//! 库存流水（append-only 审计日志）

use serde::{Deserialize, Serialize};

// ==================== 变动类型 ====================

/// 库存变动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum StockChangeType {
    /// 预占：下单锁定，locked_stock 增加
    #[cfg_attr(feature = "db", sqlx(rename = "RESERVE"))]
    Reserve,
    /// 释放：取消 / 超时回退，locked_stock 减少
    #[cfg_attr(feature = "db", sqlx(rename = "RELEASE"))]
    Release,
    /// 消耗：支付成功，stock 与 locked_stock 同时扣减
    #[cfg_attr(feature = "db", sqlx(rename = "CONSUME"))]
    Consume,
    /// 校正：运营手工调整物理库存
    #[cfg_attr(feature = "db", sqlx(rename = "ADJUST"))]
    Adjust,
}

impl StockChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockChangeType::Reserve => "RESERVE",
            StockChangeType::Release => "RELEASE",
            StockChangeType::Consume => "CONSUME",
            StockChangeType::Adjust => "ADJUST",
        }
    }
}

impl std::fmt::Display for StockChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== 流水记录 ====================

/// 单条库存流水
///
/// 与库存计数器的变更在同一事务内写入，事后可按流水重放出任意时点的库存。
/// `quantity` 记录操作数量，ADJUST 带符号（盘盈为正、盘亏为负），其余类型恒为正。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StockLogEntry {
    pub id: i64,
    pub sku_id: i64,
    pub change_type: StockChangeType,
    /// 变动数量（ADJUST 带符号，其余为正）
    pub quantity: i64,
    /// 变更后的物理库存
    pub stock_after: i64,
    /// 变更后的预占库存
    pub locked_after: i64,
    /// 关联订单（运营校正时为空）
    pub order_id: Option<i64>,
    pub remark: String,
    /// 操作者标识：user:{id} / operator:{name} / system
    pub actor: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_serde() {
        let json = serde_json::to_string(&StockChangeType::Reserve).unwrap();
        assert_eq!(json, "\"RESERVE\"");
        let back: StockChangeType = serde_json::from_str("\"ADJUST\"").unwrap();
        assert_eq!(back, StockChangeType::Adjust);
    }

    #[test]
    fn test_change_type_display() {
        assert_eq!(StockChangeType::Consume.to_string(), "CONSUME");
        assert_eq!(StockChangeType::Release.to_string(), "RELEASE");
    }
}
