//! Stock Ledger
//!
//! sku 表双计数器（stock / locked_stock）的唯一变更入口。
//! 每次成功变更在同一事务内追加一条 stock_log，计数器与流水
//! 要么一起提交要么一起回滚，事后可按流水重放出任意时点的库存。
//!
//! 守卫条件编译进单条 UPDATE：检查与修改之间没有时间窗，
//! 两个并发请求抢最后一件库存时恰好一个成功。

use crate::core::error::{TradeError, TradeResult};
use shared::models::{Sku, StockChangeType, StockLogEntry};
use shared::request::Actor;
use sqlx::SqlitePool;

const SKU_COLUMNS: &str = "id, sku_code, name, price, promotion_price, stock, locked_stock, is_active, created_at, updated_at";

const LOG_COLUMNS: &str = "id, sku_id, change_type, quantity, stock_after, locked_after, order_id, remark, actor, created_at";

// ==================== 事务内操作 ====================

/// 预占库存：locked_stock += quantity
///
/// 守卫：SKU 在售且可售数量（stock - locked_stock）足够。
/// 失败时区分三种情况：SKU 不存在、已下架、可售不足。
pub async fn reserve(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku_id: i64,
    quantity: i64,
    order_id: i64,
    order_no: &str,
    actor: &Actor,
) -> TradeResult<Sku> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE sku SET locked_stock = locked_stock + ?1, updated_at = ?2 WHERE id = ?3 AND is_active = 1 AND stock - locked_stock >= ?1 RETURNING {SKU_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Sku>(&sql)
        .bind(quantity)
        .bind(now)
        .bind(sku_id)
        .fetch_optional(&mut **tx)
        .await?;

    let Some(sku) = updated else {
        return Err(reserve_rejection(tx, sku_id, quantity).await);
    };

    append_log(
        tx,
        LogRow {
            sku_id,
            change_type: StockChangeType::Reserve,
            quantity,
            stock_after: sku.stock,
            locked_after: sku.locked_stock,
            order_id: Some(order_id),
            remark: &format!("reserve for order {order_no}"),
            actor,
            now,
        },
    )
    .await?;
    Ok(sku)
}

/// 预占失败的具体原因（守卫 UPDATE 只知道 0 行，这里补一次读）
async fn reserve_rejection(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku_id: i64,
    requested: i64,
) -> TradeError {
    let sql = format!("SELECT {SKU_COLUMNS} FROM sku WHERE id = ?");
    match sqlx::query_as::<_, Sku>(&sql)
        .bind(sku_id)
        .fetch_optional(&mut **tx)
        .await
    {
        Ok(None) => TradeError::NotFound(format!("sku {sku_id}")),
        Ok(Some(sku)) if !sku.is_active => {
            TradeError::Validation(format!("sku '{}' is not on sale", sku.name))
        }
        Ok(Some(sku)) => TradeError::InsufficientStock {
            sku_id,
            name: sku.name.clone(),
            requested,
            available: sku.available(),
        },
        Err(e) => e.into(),
    }
}

/// 释放预占：locked_stock -= quantity（取消 / 超时回退）
///
/// 守卫失败说明流水与计数器已不一致，按存储错误上抛并中止外层事务。
pub async fn release(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku_id: i64,
    quantity: i64,
    order_id: i64,
    actor: &Actor,
    remark: &str,
) -> TradeResult<Sku> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE sku SET locked_stock = locked_stock - ?1, updated_at = ?2 WHERE id = ?3 AND locked_stock >= ?1 RETURNING {SKU_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Sku>(&sql)
        .bind(quantity)
        .bind(now)
        .bind(sku_id)
        .fetch_optional(&mut **tx)
        .await?;

    let Some(sku) = updated else {
        return Err(TradeError::Database(format!(
            "release guard failed: sku {sku_id} has locked_stock < {quantity}"
        )));
    };

    append_log(
        tx,
        LogRow {
            sku_id,
            change_type: StockChangeType::Release,
            quantity,
            stock_after: sku.stock,
            locked_after: sku.locked_stock,
            order_id: Some(order_id),
            remark,
            actor,
            now,
        },
    )
    .await?;
    Ok(sku)
}

/// 消耗库存：stock -= quantity 且 locked_stock -= quantity（支付成功）
///
/// 把预占转为永久扣减。只有先预占过的数量才可消耗，
/// 守卫失败同样视为账实不符。
pub async fn consume(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku_id: i64,
    quantity: i64,
    order_id: i64,
    order_no: &str,
    actor: &Actor,
) -> TradeResult<Sku> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE sku SET stock = stock - ?1, locked_stock = locked_stock - ?1, updated_at = ?2 WHERE id = ?3 AND stock >= ?1 AND locked_stock >= ?1 RETURNING {SKU_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Sku>(&sql)
        .bind(quantity)
        .bind(now)
        .bind(sku_id)
        .fetch_optional(&mut **tx)
        .await?;

    let Some(sku) = updated else {
        return Err(TradeError::Database(format!(
            "consume guard failed: sku {sku_id} cannot consume {quantity} (not reserved?)"
        )));
    };

    append_log(
        tx,
        LogRow {
            sku_id,
            change_type: StockChangeType::Consume,
            quantity,
            stock_after: sku.stock,
            locked_after: sku.locked_stock,
            order_id: Some(order_id),
            remark: &format!("consume for order {order_no}"),
            actor,
            now,
        },
    )
    .await?;
    Ok(sku)
}

// ==================== 独立操作 ====================

/// 运营手工校正物理库存（盘盈盘亏）
///
/// delta 带符号。校正后 stock 不得低于当前预占量，
/// 否则已锁定的订单会失去对应的货。自己开写事务。
pub async fn adjust_stock(
    pool: &SqlitePool,
    sku_id: i64,
    delta: i64,
    actor: &Actor,
    remark: &str,
) -> TradeResult<Sku> {
    if delta == 0 {
        return Err(TradeError::Validation("adjustment delta must be non-zero".into()));
    }

    let mut tx = pool.begin().await?;
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE sku SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3 AND stock + ?1 >= locked_stock AND stock + ?1 >= 0 RETURNING {SKU_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Sku>(&sql)
        .bind(delta)
        .bind(now)
        .bind(sku_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(sku) = updated else {
        return Err(adjust_rejection(&mut tx, sku_id, delta).await);
    };

    append_log(
        &mut tx,
        LogRow {
            sku_id,
            change_type: StockChangeType::Adjust,
            quantity: delta,
            stock_after: sku.stock,
            locked_after: sku.locked_stock,
            order_id: None,
            remark,
            actor,
            now,
        },
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        sku_id,
        delta,
        stock = sku.stock,
        locked = sku.locked_stock,
        actor = %actor,
        "Stock adjusted"
    );
    Ok(sku)
}

async fn adjust_rejection(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    sku_id: i64,
    delta: i64,
) -> TradeError {
    let sql = format!("SELECT {SKU_COLUMNS} FROM sku WHERE id = ?");
    match sqlx::query_as::<_, Sku>(&sql)
        .bind(sku_id)
        .fetch_optional(&mut **tx)
        .await
    {
        Ok(None) => TradeError::NotFound(format!("sku {sku_id}")),
        Ok(Some(sku)) => TradeError::Validation(format!(
            "adjusting sku '{}' by {delta} would drop stock below reservations ({} locked)",
            sku.name, sku.locked_stock
        )),
        Err(e) => e.into(),
    }
}

// ==================== 流水查询 ====================

pub async fn logs_for_sku(
    pool: &SqlitePool,
    sku_id: i64,
    limit: i64,
) -> TradeResult<Vec<StockLogEntry>> {
    let sql = format!(
        "SELECT {LOG_COLUMNS} FROM stock_log WHERE sku_id = ? ORDER BY created_at DESC, id DESC LIMIT ?"
    );
    let rows = sqlx::query_as::<_, StockLogEntry>(&sql)
        .bind(sku_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn logs_for_order(pool: &SqlitePool, order_id: i64) -> TradeResult<Vec<StockLogEntry>> {
    let sql = format!(
        "SELECT {LOG_COLUMNS} FROM stock_log WHERE order_id = ? ORDER BY created_at, id"
    );
    let rows = sqlx::query_as::<_, StockLogEntry>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

// ==================== 流水写入 ====================

struct LogRow<'a> {
    sku_id: i64,
    change_type: StockChangeType,
    quantity: i64,
    stock_after: i64,
    locked_after: i64,
    order_id: Option<i64>,
    remark: &'a str,
    actor: &'a Actor,
    now: i64,
}

async fn append_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    row: LogRow<'_>,
) -> TradeResult<()> {
    sqlx::query(
        "INSERT INTO stock_log (id, sku_id, change_type, quantity, stock_after, locked_after, order_id, remark, actor, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(shared::util::snowflake_id())
    .bind(row.sku_id)
    .bind(row.change_type.as_str())
    .bind(row.quantity)
    .bind(row.stock_after)
    .bind(row.locked_after)
    .bind(row.order_id)
    .bind(row.remark)
    .bind(row.actor.label())
    .bind(row.now)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
