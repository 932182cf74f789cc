//! Money calculation utilities using rust_decimal for precision
//!
//! 金额字段落库为 f64，一切算术先转 `Decimal` 再转回，
//! 避免浮点累加误差。折扣金额向下取整到分（对买家有利的一侧截断）。

use rust_decimal::prelude::*;

/// Rounding precision for monetary values (2 decimal places)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per unit
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per order line
pub const MAX_QUANTITY: i64 = 9999;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
pub fn require_finite(value: f64, field_name: &str) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{field_name} must be a finite number, got {value}"));
    }
    Ok(())
}

/// Validate a unit price: finite, non-negative, within bounds
pub fn require_valid_price(value: f64) -> Result<(), String> {
    require_finite(value, "price")?;
    if value < 0.0 {
        return Err(format!("price must be non-negative, got {value}"));
    }
    if value > MAX_PRICE {
        return Err(format!("price exceeds maximum allowed ({MAX_PRICE}), got {value}"));
    }
    Ok(())
}

/// Validate an order line quantity: positive, within bounds
pub fn require_valid_quantity(quantity: i64) -> Result<(), String> {
    if quantity <= 0 {
        return Err(format!("quantity must be positive, got {quantity}"));
    }
    if quantity > MAX_QUANTITY {
        return Err(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"
        ));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places (half-up)
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// 向下截断到分。按比例折扣取整时用，永远不多扣买家一分钱。
#[inline]
pub fn floor_to_cent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::ToZero)
}

/// Line total = unit_price * quantity, computed in Decimal
pub fn line_total(unit_price: f64, quantity: i64) -> Decimal {
    to_decimal(unit_price) * Decimal::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_precision() {
        // Classic floating point problem: 0.1 + 0.2 != 0.3
        let a = 0.1_f64;
        let b = 0.2_f64;
        let sum_f64 = a + b;

        // f64 fails
        assert_ne!(sum_f64, 0.3);

        // Decimal succeeds
        let sum_dec = to_decimal(a) + to_decimal(b);
        assert_eq!(to_f64(sum_dec), 0.3);
    }

    #[test]
    fn test_accumulation_precision() {
        // Sum 0.01 one thousand times
        let mut total = Decimal::ZERO;
        for _ in 0..1000 {
            total += to_decimal(0.01);
        }
        assert_eq!(to_f64(total), 10.0);
    }

    #[test]
    fn test_line_total_precision() {
        // 10.99 * 3
        assert_eq!(to_f64(line_total(10.99, 3)), 32.97);
        // 0.01 * 100
        assert_eq!(to_f64(line_total(0.01, 100)), 1.0);
    }

    // ========================================================================
    // floor_to_cent 边界测试
    // ========================================================================

    #[test]
    fn test_floor_to_cent_truncates() {
        // 14.9985 向下截断，不做四舍五入
        let value = to_decimal(99.99) * to_decimal(15.0) / Decimal::ONE_HUNDRED;
        assert_eq!(to_f64(floor_to_cent(value)), 14.99);
    }

    #[test]
    fn test_floor_to_cent_exact_value_unchanged() {
        // 250 * 15% = 37.50 整，无截断
        let value = to_decimal(250.0) * to_decimal(15.0) / Decimal::ONE_HUNDRED;
        assert_eq!(to_f64(floor_to_cent(value)), 37.50);
    }

    #[test]
    fn test_floor_to_cent_just_below_next_cent() {
        let value = Decimal::new(10_009, 3); // 10.009
        assert_eq!(to_f64(floor_to_cent(value)), 10.0);
    }

    // ========================================================================
    // 校验边界测试
    // ========================================================================

    #[test]
    fn test_require_finite_rejects_nan_and_infinity() {
        assert!(require_finite(f64::NAN, "price").is_err());
        assert!(require_finite(f64::INFINITY, "price").is_err());
        assert!(require_finite(f64::NEG_INFINITY, "price").is_err());
        assert!(require_finite(0.0, "price").is_ok());
    }

    #[test]
    fn test_require_valid_price_bounds() {
        assert!(require_valid_price(0.0).is_ok());
        assert!(require_valid_price(99.99).is_ok());
        assert!(require_valid_price(MAX_PRICE).is_ok());
        assert!(require_valid_price(MAX_PRICE + 1.0).is_err());
        assert!(require_valid_price(-0.01).is_err());
        assert!(require_valid_price(f64::NAN).is_err());
    }

    #[test]
    fn test_require_valid_quantity_bounds() {
        assert!(require_valid_quantity(1).is_ok());
        assert!(require_valid_quantity(MAX_QUANTITY).is_ok());
        assert!(require_valid_quantity(0).is_err());
        assert!(require_valid_quantity(-3).is_err());
        assert!(require_valid_quantity(MAX_QUANTITY + 1).is_err());
    }
}
