//! Decimal-string comparison used for every numeric assertion.
//!
//! The exchange formats quantities to each asset's display precision, so the
//! same value can come back as `"11"`, `"11.0"` or `"11.0000"`. Comparing the
//! raw strings is wrong; these helpers parse both sides into `Decimal` and
//! compare the values.

use crate::error::CoreError;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fallback scale when an asset reports no precision at all.
pub const DEFAULT_PRECISION: u32 = 8;

/// Parses a decimal string, accepting plain and scientific notation.
pub fn parse_decimal(raw: &str) -> Result<Decimal, CoreError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| CoreError::InvalidDecimal(raw.to_string()))
}

/// Numeric equality of two decimal strings, ignoring trailing zeros and formatting.
pub fn decimal_eq(actual: &str, expected: &str) -> Result<bool, CoreError> {
    Ok(parse_decimal(actual)? == parse_decimal(expected)?)
}

/// Fails with `CoreError::ValueMismatch` unless `actual` and `expected` are numerically equal.
pub fn assert_decimal_eq(context: &str, actual: &str, expected: &str) -> Result<(), CoreError> {
    if decimal_eq(actual, expected)? {
        Ok(())
    } else {
        tracing::debug!(context, actual, expected, "decimal mismatch");
        Err(CoreError::ValueMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Rounds to `precision` decimal places, half away from zero.
pub fn round_to_precision(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero)
}

/// The quote amount a limit order reserves: `amount * price` at the asset's display precision.
pub fn notional(amount: Decimal, price: Decimal, precision: u32) -> Decimal {
    round_to_precision(amount * price, precision)
}
