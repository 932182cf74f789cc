//! System State Repository (Singleton)

use super::{RepoError, RepoResult};
use sqlx::SqlitePool;

const SINGLETON_ID: i64 = 1;

/// 单例系统状态行，保存订单号序列
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SystemState {
    pub id: i64,
    pub next_order_seq: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

pub async fn get_or_create(pool: &SqlitePool) -> RepoResult<SystemState> {
    if let Some(state) = get(pool).await? {
        return Ok(state);
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT OR IGNORE INTO system_state (id, next_order_seq, created_at, updated_at) VALUES (?1, 0, ?2, ?2)",
    )
    .bind(SINGLETON_ID)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create system state".into()))
}

pub async fn get(pool: &SqlitePool) -> RepoResult<Option<SystemState>> {
    let state = sqlx::query_as::<_, SystemState>(
        "SELECT id, next_order_seq, created_at, updated_at FROM system_state WHERE id = ?",
    )
    .bind(SINGLETON_ID)
    .fetch_optional(pool)
    .await?;
    Ok(state)
}

/// Atomically increment the order sequence and return the new value
///
/// 在下单事务内调用；事务回滚时序号一并回退，不产生空洞。
/// 单例行不存在时就地补建（测试环境可跳过显式初始化）。
pub async fn next_order_seq(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let seq = sqlx::query_scalar::<_, i64>(
        "UPDATE system_state SET next_order_seq = next_order_seq + 1, updated_at = ?1 WHERE id = ?2 RETURNING next_order_seq",
    )
    .bind(now)
    .bind(SINGLETON_ID)
    .fetch_optional(&mut **tx)
    .await?;

    match seq {
        Some(value) => Ok(value),
        None => {
            sqlx::query(
                "INSERT INTO system_state (id, next_order_seq, created_at, updated_at) VALUES (?1, 1, ?2, ?2)",
            )
            .bind(SINGLETON_ID)
            .bind(now)
            .execute(&mut **tx)
            .await?;
            Ok(1)
        }
    }
}
