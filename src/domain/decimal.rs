//! Exact decimal type for quantities and prices, backed by rust_decimal.
//!
//! Quantities are persisted as canonical strings so no precision is lost between
//! the store and the valuation pass.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exact decimal number used for position quantities and unit prices.
///
/// Serializes to a JSON number.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Wrap a rust_decimal value.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format without exponent notation or trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// The additive identity.
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// Sum, or None on overflow.
    pub fn checked_add(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    /// Product, or None on overflow.
    pub fn checked_mul(self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// Drop the fractional part (toward zero) and convert to i64.
    ///
    /// Returns None when the integral part does not fit.
    pub fn trunc_to_i64(&self) -> Option<i64> {
        self.0.trunc().to_i64()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string_strips_trailing_zeros() {
        let d = Decimal::from_str_canonical("1.2500").unwrap();
        assert_eq!(d.to_canonical_string(), "1.25");
        assert_eq!(Decimal::from_str_canonical("100").unwrap().to_string(), "100");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let d = Decimal::from_str_canonical(" 0.5 ").unwrap();
        assert_eq!(d.to_canonical_string(), "0.5");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Decimal::from_str_canonical("abc").is_err());
        assert!(Decimal::from_str_canonical("").is_err());
    }

    #[test]
    fn test_trunc_to_i64_goes_toward_zero() {
        assert_eq!(Decimal::from_str("12.999").unwrap().trunc_to_i64(), Some(12));
        assert_eq!(Decimal::from_str("-12.999").unwrap().trunc_to_i64(), Some(-12));
        assert_eq!(Decimal::from_str("0.4").unwrap().trunc_to_i64(), Some(0));
    }

    #[test]
    fn test_trunc_to_i64_overflow() {
        let huge = Decimal::from_str("100000000000000000000").unwrap();
        assert_eq!(huge.trunc_to_i64(), None);
    }

    #[test]
    fn test_checked_ops() {
        let a = Decimal::from_str("1.5").unwrap();
        let b = Decimal::from_str("2").unwrap();
        assert_eq!(a.checked_mul(b), Some(Decimal::from(3)));
        assert_eq!(a.checked_add(b).unwrap().to_string(), "3.5");
        assert_eq!(Decimal::new(RustDecimal::MAX).checked_add(b), None);
    }

    #[test]
    fn test_json_serialization_is_number() {
        let d = Decimal::from_str("123.456").unwrap();
        let json = serde_json::to_value(d).unwrap();
        assert!(json.is_number());
    }
}
