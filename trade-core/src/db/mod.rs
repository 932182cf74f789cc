//! Database Module
//!
//! Handles SQLite connection pools and migrations

pub mod repository;

use crate::core::error::{TradeError, TradeResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

/// Database service with WAL mode and separate read/write pools
///
/// 写池只保留一个连接。SQLite 同一时刻只允许一个写事务，
/// 固定单写连接把并发写从 SQLITE_BUSY 竞争变为池内排队，
/// 读池走 WAL 快照，不被写事务阻塞。
#[derive(Clone)]
pub struct DbService {
    pub read_pool: SqlitePool,
    pub write_pool: SqlitePool,
}

impl DbService {
    /// Open (creating if missing) the database and apply migrations
    pub async fn new(db_path: &str) -> TradeResult<Self> {
        // Build connection options: WAL, foreign keys, normal sync
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| TradeError::Database(format!("invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON")
            // 写冲突时等待 5s 而非立即失败
            .busy_timeout(Duration::from_millis(5000))
            .optimize_on_close(true, None);

        let write_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .map_err(|e| TradeError::Database(format!("failed to open database: {e}")))?;

        let read_pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| TradeError::Database(format!("failed to open read pool: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        // Run migrations (ignore previously applied but now removed migrations)
        sqlx::migrate!("./migrations")
            .set_ignore_missing(true)
            .run(&write_pool)
            .await
            .map_err(|e| TradeError::Database(format!("failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self {
            read_pool,
            write_pool,
        })
    }
}
