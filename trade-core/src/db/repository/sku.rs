//! SKU Repository

use super::{RepoError, RepoResult};
use crate::orders::money;
use crate::utils::validation::{MAX_NAME_LEN, MAX_SHORT_TEXT_LEN};
use shared::models::{Sku, SkuCreate};
use sqlx::SqlitePool;

const SKU_SELECT: &str = "SELECT id, sku_code, name, price, promotion_price, stock, locked_stock, is_active, created_at, updated_at FROM sku";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Sku>> {
    let sql = format!("{} WHERE is_active = 1 ORDER BY created_at DESC", SKU_SELECT);
    let rows = sqlx::query_as::<_, Sku>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Sku>> {
    let sql = format!("{} WHERE id = ?", SKU_SELECT);
    let row = sqlx::query_as::<_, Sku>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_code(pool: &SqlitePool, sku_code: &str) -> RepoResult<Option<Sku>> {
    let sql = format!("{} WHERE sku_code = ?", SKU_SELECT);
    let row = sqlx::query_as::<_, Sku>(&sql)
        .bind(sku_code)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: SkuCreate) -> RepoResult<Sku> {
    if data.sku_code.trim().is_empty() || data.sku_code.len() > MAX_SHORT_TEXT_LEN {
        return Err(RepoError::Validation("invalid sku_code".into()));
    }
    if data.name.trim().is_empty() || data.name.len() > MAX_NAME_LEN {
        return Err(RepoError::Validation("invalid sku name".into()));
    }
    money::require_valid_price(data.price).map_err(RepoError::Validation)?;
    if let Some(p) = data.promotion_price {
        money::require_valid_price(p).map_err(RepoError::Validation)?;
    }
    if data.stock < 0 {
        return Err(RepoError::Validation("initial stock must be >= 0".into()));
    }

    if find_by_code(pool, &data.sku_code).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "SKU code '{}' already exists",
            data.sku_code
        )));
    }

    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    sqlx::query(
        "INSERT INTO sku (id, sku_code, name, price, promotion_price, stock, locked_stock, is_active, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 1, ?7, ?7)",
    )
    .bind(id)
    .bind(&data.sku_code)
    .bind(&data.name)
    .bind(data.price)
    .bind(data.promotion_price)
    .bind(data.stock)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create SKU".into()))
}

/// 上架 / 下架。下架不影响已存在订单，只阻止新的预占。
pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query("UPDATE sku SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(active)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}
