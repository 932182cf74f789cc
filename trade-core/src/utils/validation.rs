//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Limits are chosen based on:
//! - Reasonable UX limits for names and remarks
//! - SQLite TEXT has no built-in length enforcement
//!
//! 返回裸错误信息字符串，由调用方包装成各自层的错误类型
//! （仓储层 `RepoError::Validation`，服务层 `TradeError::Validation`）。

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: sku name, promotion rule name, etc.
pub const MAX_NAME_LEN: usize = 200;

/// Order remarks and stock adjustment remarks
pub const MAX_REMARK_LEN: usize = 500;

/// Short identifiers: sku_code, payment_ref, tracking_no, etc.
pub const MAX_SHORT_TEXT_LEN: usize = 100;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if value.len() > max_len {
        return Err(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        ));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), String> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        ));
    }
    Ok(())
}
