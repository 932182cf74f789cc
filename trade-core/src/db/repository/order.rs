//! Order Repository
//!
//! 订单行的读写。状态迁移全部走带守卫条件的 UPDATE，
//! 由 rows_affected 判定迁移是否真的发生，调用方据此返回状态错误。

use super::RepoResult;
use shared::models::{Order, OrderItem};
use sqlx::SqlitePool;

const ORDER_SELECT: &str = "SELECT id, order_no, user_id, address_id, subtotal, promotion_id, discount_amount, pay_amount, status, payment_status, payment_ref, tracking_no, remark, pay_time, created_at, updated_at FROM orders";

const ITEM_SELECT: &str = "SELECT id, order_id, sku_id, sku_name, quantity, unit_price, line_total, created_at FROM order_item";

// ==================== 查询 ====================

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ?", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_order_no(pool: &SqlitePool, order_no: &str) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE order_no = ?", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(order_no)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Order>> {
    let sql = format!("{} WHERE user_id = ? ORDER BY created_at DESC", ORDER_SELECT);
    let rows = sqlx::query_as::<_, Order>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn items_for_order(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{} WHERE order_id = ? ORDER BY id", ITEM_SELECT);
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// 事务内读取订单行（取消 / 支付流程在同一事务内先读后改）
pub async fn find_by_id_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    id: i64,
) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ?", ORDER_SELECT);
    let row = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(row)
}

pub async fn items_for_order_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
) -> RepoResult<Vec<OrderItem>> {
    let sql = format!("{} WHERE order_id = ? ORDER BY id", ITEM_SELECT);
    let rows = sqlx::query_as::<_, OrderItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows)
}

// ==================== 写入 ====================

pub async fn insert_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order: &Order,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, order_no, user_id, address_id, subtotal, promotion_id, discount_amount, pay_amount, status, payment_status, payment_ref, tracking_no, remark, pay_time, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )
    .bind(order.id)
    .bind(&order.order_no)
    .bind(order.user_id)
    .bind(order.address_id)
    .bind(order.subtotal)
    .bind(order.promotion_id)
    .bind(order.discount_amount)
    .bind(order.pay_amount)
    .bind(order.status.as_str())
    .bind(order.payment_status.as_str())
    .bind(&order.payment_ref)
    .bind(&order.tracking_no)
    .bind(&order.remark)
    .bind(order.pay_time)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn insert_item(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    item: &OrderItem,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO order_item (id, order_id, sku_id, sku_name, quantity, unit_price, line_total, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(item.id)
    .bind(item.order_id)
    .bind(item.sku_id)
    .bind(&item.sku_name)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.line_total)
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ==================== 状态迁移（守卫 UPDATE） ====================
// 返回 rows_affected：0 表示订单已不在允许迁移的状态，由调用方决定如何上报。

/// 待支付 + 未付款 -> 待发货 + 已付款
pub async fn mark_paid_guarded(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    payment_ref: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE orders SET status = 'PENDING_SHIPMENT', payment_status = 'PAID', payment_ref = ?1, pay_time = ?2, updated_at = ?2 WHERE id = ?3 AND status = 'PENDING_PAYMENT' AND payment_status = 'UNPAID'",
    )
    .bind(payment_ref)
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// 待支付 + 未付款 -> 已取消。用户取消与超时清理共用此守卫，
/// 两者竞争时输家拿到 0 行。
pub async fn cancel_guarded(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    order_id: i64,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE orders SET status = 'CANCELLED', updated_at = ?1 WHERE id = ?2 AND status = 'PENDING_PAYMENT' AND payment_status = 'UNPAID'",
    )
    .bind(now)
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(rows.rows_affected())
}

/// 待发货 + 已付款 -> 已发货。无库存副作用，单条语句即可。
pub async fn ship_guarded(
    pool: &SqlitePool,
    order_id: i64,
    tracking_no: &str,
    now: i64,
) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE orders SET status = 'SHIPPED', tracking_no = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'PENDING_SHIPMENT' AND payment_status = 'PAID'",
    )
    .bind(tracking_no)
    .bind(now)
    .bind(order_id)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected())
}

// ==================== 超时清理 ====================

/// 超时未支付订单 ID（创建时间早于 cutoff 的 PENDING_PAYMENT/UNPAID）
pub async fn expired_unpaid_ids(pool: &SqlitePool, cutoff_ms: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM orders WHERE status = 'PENDING_PAYMENT' AND payment_status = 'UNPAID' AND created_at <= ? ORDER BY created_at",
    )
    .bind(cutoff_ms)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// 批量完结：已付款且最后一次更新早于 cutoff 的待发货 / 已发货订单。
/// 谓词天然幂等，重复执行不会二次迁移。
pub async fn complete_overdue(pool: &SqlitePool, cutoff_ms: i64, now: i64) -> RepoResult<u64> {
    let rows = sqlx::query(
        "UPDATE orders SET status = 'COMPLETED', updated_at = ?1 WHERE payment_status = 'PAID' AND status IN ('PENDING_SHIPMENT', 'SHIPPED') AND updated_at <= ?2",
    )
    .bind(now)
    .bind(cutoff_ms)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected())
}
