//! Promotion resolution
//!
//! 纯函数，不碰数据库：调用方先取出候选规则，这里只做命中与算钱。
//! 多条规则命中同一订单时取门槛最高的一条，门槛相同取先遇到的。

use crate::orders::money;
use rust_decimal::Decimal;
use shared::models::{PromotionRule, PromotionType};

/// 规则当前是否生效：启用开关 + 时间窗（左闭右开）
pub fn is_rule_active(rule: &PromotionRule, now_ms: i64) -> bool {
    if !rule.is_active {
        return false;
    }
    if let Some(start) = rule.start_time
        && now_ms < start
    {
        return false;
    }
    if let Some(end) = rule.end_time
        && now_ms >= end
    {
        return false;
    }
    true
}

/// 在候选规则中挑出订单小计命中的最优规则
///
/// 命中条件：规则生效且 threshold <= subtotal。
/// 返回门槛最大的一条；无命中返回 None。
pub fn best_rule<'a>(
    subtotal: f64,
    rules: &'a [PromotionRule],
    now_ms: i64,
) -> Option<&'a PromotionRule> {
    let subtotal = money::to_decimal(subtotal);
    let mut best: Option<(&PromotionRule, Decimal)> = None;
    for rule in rules {
        if !is_rule_active(rule, now_ms) {
            continue;
        }
        let threshold = money::to_decimal(rule.threshold);
        if threshold > subtotal {
            continue;
        }
        // 严格大于才替换，门槛相同保留先遇到的规则
        match best {
            Some((_, current)) if current >= threshold => {}
            _ => best = Some((rule, threshold)),
        }
    }
    best.map(|(rule, _)| rule)
}

/// 计算某条规则对给定小计的折扣金额
///
/// 固定满减直接取配置金额；按比例折扣向下截断到分，
/// 截断方向永远对买家有利。
pub fn discount_for(rule: &PromotionRule, subtotal: f64) -> Decimal {
    match rule.promo_type {
        PromotionType::FlatAmount => money::to_decimal(rule.discount_value),
        PromotionType::Percent => money::floor_to_cent(
            money::to_decimal(subtotal) * money::to_decimal(rule.discount_value)
                / Decimal::ONE_HUNDRED,
        ),
    }
}

/// 命中 + 算钱一步完成，下单路径的入口
pub fn resolve(
    subtotal: f64,
    rules: &[PromotionRule],
    now_ms: i64,
) -> Option<(&PromotionRule, Decimal)> {
    best_rule(subtotal, rules, now_ms).map(|rule| (rule, discount_for(rule, subtotal)))
}
