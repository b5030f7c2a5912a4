//! Monetary amount type.
//!
//! Amounts are represented as fixed-point integers (u128) to avoid floating-point errors.
//! The smallest unit is 1 base unit; one display unit is `10^18` base units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::TypesError;

/// A value held in escrow or paid out, in base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Fractional digits of one display unit.
    pub const DECIMALS: u32 = 18;

    /// Base units in one display unit.
    pub const ONE: Self = Self(10u128.pow(Self::DECIMALS));

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Parse a decimal display string such as `"1"`, `"0.5"` or `"0.01"`.
    ///
    /// The conversion is exact: inputs with more than [`Self::DECIMALS`]
    /// fractional digits are rejected rather than rounded.
    pub fn parse_decimal(s: &str) -> Result<Self, TypesError> {
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(TypesError::InvalidAmount(s.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(frac) {
            return Err(TypesError::InvalidAmount(s.to_string()));
        }
        if frac.len() > Self::DECIMALS as usize {
            return Err(TypesError::TooPrecise { max: Self::DECIMALS });
        }

        let whole_units: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| TypesError::AmountOverflow)?
        };
        let frac_units: u128 = if frac.is_empty() {
            0
        } else {
            let scale = 10u128.pow(Self::DECIMALS - frac.len() as u32);
            // At most 18 digits, always fits.
            frac.parse::<u128>().map_err(|_| TypesError::InvalidAmount(s.to_string()))? * scale
        };

        whole_units
            .checked_mul(Self::ONE.0)
            .and_then(|w| w.checked_add(frac_units))
            .map(Self)
            .ok_or(TypesError::AmountOverflow)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

/// Renders the display unit with trailing fractional zeros trimmed (`1.5`, `0.01`, `3`).
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::ONE.0;
        let frac = self.0 % Self::ONE.0;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{:0width$}", frac, width = Self::DECIMALS as usize);
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_whole_and_fractional() {
        assert_eq!(Amount::parse_decimal("1").unwrap(), Amount::ONE);
        assert_eq!(
            Amount::parse_decimal("0.5").unwrap().raw(),
            500_000_000_000_000_000
        );
        assert_eq!(Amount::parse_decimal("0.01").unwrap().raw(), 10_000_000_000_000_000);
        assert_eq!(Amount::parse_decimal(".25").unwrap().raw(), 250_000_000_000_000_000);
        assert_eq!(Amount::parse_decimal("2.").unwrap().raw(), 2 * Amount::ONE.raw());
    }

    #[test]
    fn parse_smallest_unit_is_exact() {
        let wei = Amount::parse_decimal("0.000000000000000001").unwrap();
        assert_eq!(wei.raw(), 1);
    }

    #[test]
    fn parse_rejects_excess_precision() {
        let err = Amount::parse_decimal("0.0000000000000000001").unwrap_err();
        assert_eq!(err, TypesError::TooPrecise { max: 18 });
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Amount::parse_decimal("").is_err());
        assert!(Amount::parse_decimal(".").is_err());
        assert!(Amount::parse_decimal("-1").is_err());
        assert!(Amount::parse_decimal("1e18").is_err());
        assert!(Amount::parse_decimal("1.2.3").is_err());
    }

    #[test]
    fn parse_overflow() {
        let huge = "9".repeat(40);
        assert_eq!(
            Amount::parse_decimal(&huge).unwrap_err(),
            TypesError::AmountOverflow
        );
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Amount::ONE.to_string(), "1");
        assert_eq!(Amount::new(1_500_000_000_000_000_000).to_string(), "1.5");
        assert_eq!(Amount::new(10_000_000_000_000_000).to_string(), "0.01");
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn half_is_not_one() {
        let half = Amount::parse_decimal("0.5").unwrap();
        assert_ne!(half, Amount::ONE);
        assert!(half < Amount::ONE);
    }
}
