//! Promotion Rule Repository
//!
//! 满减规则的落库与查询。命中逻辑本身在 `promotion::resolver`，
//! 这里只负责 CRUD 和创建时的规则合法性校验。

use super::{RepoError, RepoResult};
use crate::orders::money;
use crate::utils::validation::MAX_NAME_LEN;
use shared::models::{PromotionRule, PromotionRuleCreate, PromotionType};
use sqlx::SqlitePool;

const PROMOTION_SELECT: &str = "SELECT id, name, promo_type, threshold, discount_value, start_time, end_time, is_active, created_at, updated_at FROM promotion";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<PromotionRule>> {
    let sql = format!("{} ORDER BY threshold DESC", PROMOTION_SELECT);
    let rows = sqlx::query_as::<_, PromotionRule>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<PromotionRule>> {
    let sql = format!("{} WHERE id = ?", PROMOTION_SELECT);
    let row = sqlx::query_as::<_, PromotionRule>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<PromotionRule>> {
    let sql = format!("{} WHERE name = ?", PROMOTION_SELECT);
    let row = sqlx::query_as::<_, PromotionRule>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// 查询当前时刻启用且在生效窗口内的规则（窗口为左闭右开）
pub async fn find_active(pool: &SqlitePool, now_ms: i64) -> RepoResult<Vec<PromotionRule>> {
    let sql = format!(
        "{} WHERE is_active = 1 AND (start_time IS NULL OR start_time <= ?1) AND (end_time IS NULL OR ?1 < end_time) ORDER BY threshold DESC",
        PROMOTION_SELECT
    );
    let rows = sqlx::query_as::<_, PromotionRule>(&sql)
        .bind(now_ms)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// 创建促销规则
///
/// 规则合法性在此处一次性校验，命中计算不再重复检查：
/// - FLAT_AMOUNT 的减免额必须严格小于门槛（满 100 减 100 不允许）
/// - PERCENT 的折扣百分比必须落在 (0, 100) 开区间
pub async fn create(pool: &SqlitePool, data: PromotionRuleCreate) -> RepoResult<PromotionRule> {
    if data.name.trim().is_empty() || data.name.len() > MAX_NAME_LEN {
        return Err(RepoError::Validation("invalid promotion name".into()));
    }
    money::require_finite(data.threshold, "threshold").map_err(RepoError::Validation)?;
    money::require_finite(data.discount_value, "discount_value").map_err(RepoError::Validation)?;
    if data.threshold <= 0.0 {
        return Err(RepoError::Validation("threshold must be > 0".into()));
    }
    match data.promo_type {
        PromotionType::FlatAmount => {
            if data.discount_value <= 0.0 || data.discount_value >= data.threshold {
                return Err(RepoError::Validation(
                    "flat discount must be > 0 and below the threshold".into(),
                ));
            }
        }
        PromotionType::Percent => {
            if data.discount_value <= 0.0 || data.discount_value >= 100.0 {
                return Err(RepoError::Validation(
                    "percent discount must be within (0, 100)".into(),
                ));
            }
        }
    }
    if let (Some(start), Some(end)) = (data.start_time, data.end_time)
        && end <= start
    {
        return Err(RepoError::Validation("end_time must be after start_time".into()));
    }

    if find_by_name(pool, &data.name).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "Promotion '{}' already exists",
            data.name
        )));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO promotion (id, name, promo_type, threshold, discount_value, start_time, end_time, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(data.promo_type.as_str())
    .bind(data.threshold)
    .bind(data.discount_value)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create promotion".into()))
}

/// 启用 / 停用规则
pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE promotion SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
