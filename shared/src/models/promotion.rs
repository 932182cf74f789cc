//! 满减 / 折扣促销规则

use serde::{Deserialize, Serialize};

// ==================== 促销类型 ====================

/// 促销折扣类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
pub enum PromotionType {
    /// 满减固定金额（如满 100 减 10）
    #[cfg_attr(feature = "db", sqlx(rename = "FLAT_AMOUNT"))]
    FlatAmount,
    /// 按比例折扣（discount_value 为百分比，如 15 表示 85 折）
    #[cfg_attr(feature = "db", sqlx(rename = "PERCENT"))]
    Percent,
}

impl PromotionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionType::FlatAmount => "FLAT_AMOUNT",
            PromotionType::Percent => "PERCENT",
        }
    }
}

impl std::fmt::Display for PromotionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==================== 促销规则 ====================

/// 满额促销规则
///
/// 订单小计达到 `threshold` 即可命中；多条命中时取 threshold 最大的一条。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PromotionRule {
    pub id: i64,
    pub name: String,
    pub promo_type: PromotionType,
    /// 满额门槛（订单小计 >= threshold 时命中）
    pub threshold: f64,
    /// FLAT_AMOUNT: 减免金额；PERCENT: 折扣百分比（0 < v < 100）
    pub discount_value: f64,
    /// 生效起始时间（毫秒，None 表示不限）
    pub start_time: Option<i64>,
    /// 生效截止时间（毫秒，None 表示不限）
    pub end_time: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// 创建促销规则的输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionRuleCreate {
    pub name: String,
    pub promo_type: PromotionType,
    pub threshold: f64,
    pub discount_value: f64,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
}
