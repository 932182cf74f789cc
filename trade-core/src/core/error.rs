//! 交易层错误类型

use crate::db::repository::RepoError;
use shared::models::{OrderStatus, PaymentStatus};
use thiserror::Error;

/// 交易操作错误
///
/// | 变体 | 含义 | 处理建议 |
/// |------|------|----------|
/// | InsufficientStock | 可售库存不足 | 提示用户调整数量 |
/// | InvalidStateTransition | 订单状态不允许该操作 | 刷新订单后重试 |
/// | NotFound | 资源不存在 | 检查 ID |
/// | Validation | 入参校验失败 | 修正请求 |
/// | StorageBusy | 写锁竞争，瞬时错误 | 可安全重试 |
/// | Database | 其他数据库错误 | 记录日志并上报 |
#[derive(Debug, Error)]
pub enum TradeError {
    #[error("insufficient stock for {name} (sku {sku_id}): requested {requested}, available {available}")]
    InsufficientStock {
        sku_id: i64,
        name: String,
        requested: i64,
        available: i64,
    },

    #[error("order {order_id} cannot {action} in state {status}/{payment_status}")]
    InvalidStateTransition {
        order_id: i64,
        status: OrderStatus,
        payment_status: PaymentStatus,
        action: &'static str,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage busy: {0}")]
    StorageBusy(String),

    #[error("database error: {0}")]
    Database(String),
}

pub type TradeResult<T> = Result<T, TradeError>;

impl TradeError {
    /// 瞬时错误可以在上层安全重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, TradeError::StorageBusy(_))
    }
}

/// 将底层数据库错误消息分类
///
/// SQLite 的写锁竞争（SQLITE_BUSY / SQLITE_LOCKED）通过字符串匹配识别，
/// 归入 StorageBusy 供上层重试；其余一律视为不可重试的 Database 错误。
fn classify_db_error(msg: String) -> TradeError {
    let lower = msg.to_lowercase();
    if lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("busy")
    {
        return TradeError::StorageBusy(msg);
    }
    TradeError::Database(msg)
}

impl From<RepoError> for TradeError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => TradeError::NotFound(msg),
            RepoError::Duplicate(msg) => TradeError::Validation(msg),
            RepoError::Validation(msg) => TradeError::Validation(msg),
            RepoError::Database(msg) => classify_db_error(msg),
        }
    }
}

impl From<sqlx::Error> for TradeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => TradeError::NotFound("row not found".into()),
            other => classify_db_error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_errors_are_retryable() {
        let err = classify_db_error("database is locked".to_string());
        assert!(err.is_retryable());

        let err = classify_db_error("error returned from database: database is locked".to_string());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_other_db_errors_are_not_retryable() {
        let err = classify_db_error("UNIQUE constraint failed: sku.sku_code".to_string());
        assert!(!err.is_retryable());
        assert!(matches!(err, TradeError::Database(_)));
    }

    #[test]
    fn test_repo_error_mapping() {
        let err: TradeError = RepoError::NotFound("sku 9".into()).into();
        assert!(matches!(err, TradeError::NotFound(_)));

        let err: TradeError = RepoError::Duplicate("name taken".into()).into();
        assert!(matches!(err, TradeError::Validation(_)));
    }
}
