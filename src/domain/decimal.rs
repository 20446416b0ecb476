//! Exact decimal numeric type backed by rust_decimal.
//!
//! All ledger arithmetic goes through this type. Rounding only happens when a
//! caller asks for it explicitly with [`Decimal::round_dp`].

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exact decimal for quantities, rates and USD values.
///
/// Serializes as a canonical string so CSV and JSON output never pass
/// through a float.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::str")] RustDecimal);

impl Decimal {
    /// Parse a Decimal from a string losslessly.
    ///
    /// Accepts scientific notation (`1e-7`) as exchanges occasionally export it.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        let s = s.trim();
        RustDecimal::from_str(s)
            .or_else(|_| RustDecimal::from_scientific(s))
            .map(Decimal)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// Division that yields `None` on a zero divisor or when the quotient
    /// does not fit in 96 bits.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    pub fn checked_sub(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    /// Round to `dp` decimal places using banker's rounding.
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(self.0.round_dp(dp))
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

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

/// Panics on a zero divisor or overflow; use [`Decimal::checked_div`] on
/// untrusted operands.
impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_parse_canonical() {
        assert_eq!(d("123.4500").to_canonical_string(), "123.45");
        assert_eq!(d(" 42 ").to_canonical_string(), "42");
        assert!(Decimal::from_str_canonical("abc").is_err());
    }

    #[test]
    fn test_decimal_parse_scientific() {
        assert_eq!(d("1e-7"), d("0.0000001"));
        assert_eq!(d("2.5E3"), d("2500"));
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");
        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("5").checked_div(Decimal::zero()), None);
        assert_eq!(d("5").checked_div(d("2")), Some(d("2.5")));
    }

    #[test]
    fn test_checked_ops_overflow() {
        let max = d("79228162514264337593543950335");
        assert_eq!(d("1e10").checked_div(d("1e-20")), None);
        assert_eq!(max.checked_mul(d("2")), None);
        assert_eq!(max.checked_sub(d("-1")), None);
        assert_eq!(d("1.5").checked_mul(d("4")), Some(d("6")));
        assert_eq!(d("1.5").checked_sub(d("4")), Some(d("-2.5")));
    }

    #[test]
    fn test_round_dp_is_bankers() {
        assert_eq!(d("1.005").round_dp(2), d("1.00"));
        assert_eq!(d("1.015").round_dp(2), d("1.02"));
        assert_eq!(d("-3.14159").round_dp(2), d("-3.14"));
    }

    #[test]
    fn test_min_and_sum() {
        assert_eq!(d("3").min(d("2")), d("2"));
        assert_eq!(d("2").min(d("3")), d("2"));
        let total: Decimal = vec![d("1.1"), d("2.2"), d("3.3")].into_iter().sum();
        assert_eq!(total, d("6.6"));
    }

    #[test]
    fn test_decimal_json_is_string() {
        let json = serde_json::to_value(d("123.456")).unwrap();
        assert_eq!(json, serde_json::json!("123.456"));
    }

    #[test]
    fn test_sign_helpers() {
        assert!(d("0.1").is_positive());
        assert!(d("-0.1").is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }
}
