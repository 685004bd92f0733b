//! Fixed-point ledger amounts.
//!
//! Every balance on the ledger is a signed 64-bit count of minor units, with
//! seven implied fractional digits. Decimal strings are converted exactly:
//! extra fractional digits are truncated, never rounded.

use borsh::{BorshDeserialize, BorshSerialize};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of fractional digits carried by a minor unit.
pub const DECIMALS: usize = 7;

/// Minor units per whole display unit.
pub const ONE: i64 = 10_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures of [`AmountCodec::encode`].
pub enum AmountError {
    #[error("invalid amount format: {0:?}")]
    InvalidFormat(String),
    #[error("amount {0} does not fit the 64-bit ledger range")]
    Overflow(String),
    #[error("amount must be non-negative, got {0}")]
    InvalidAmount(i64),
}

/// Decimal string to minor-unit conversion.
pub struct AmountCodec;

impl AmountCodec {
    /// Encodes a decimal string (`-?digits(.digits)?`) into minor units.
    ///
    /// With `strict` unset, malformed or out-of-range input yields zero
    /// instead of an error.
    pub fn encode(value: &str, strict: bool) -> Result<i64, AmountError> {
        match Self::encode_checked(value) {
            Ok(units) => Ok(units),
            Err(err) if strict => Err(err),
            Err(_) => Ok(0),
        }
    }

    /// Renders non-negative minor units as a canonical decimal string.
    pub fn decode(minor_units: i64) -> Result<String, AmountError> {
        if minor_units < 0 {
            return Err(AmountError::InvalidAmount(minor_units));
        }
        Ok(format_units(minor_units.unsigned_abs()))
    }

    fn encode_checked(value: &str) -> Result<i64, AmountError> {
        let invalid = || AmountError::InvalidFormat(value.to_string());
        let overflow = || AmountError::Overflow(value.to_string());

        let (negative, body) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => {
                if !is_digits(frac_part) {
                    return Err(invalid());
                }
                (int_part, frac_part)
            }
            None => (body, ""),
        };
        if !is_digits(int_part) {
            return Err(invalid());
        }

        let mut fraction: String = frac_part.chars().take(DECIMALS).collect();
        while fraction.len() < DECIMALS {
            fraction.push('0');
        }

        // i64::MAX has 19 digits; anything longer cannot fit after scaling.
        let int_digits = int_part.trim_start_matches('0');
        if int_digits.len() > 19 {
            return Err(overflow());
        }
        let whole: i128 = if int_digits.is_empty() {
            0
        } else {
            int_digits.parse().map_err(|_| overflow())?
        };
        let frac: i128 = fraction.parse().map_err(|_| invalid())?;

        let magnitude = whole
            .checked_mul(i128::from(ONE))
            .and_then(|scaled| scaled.checked_add(frac))
            .ok_or_else(overflow)?;
        let signed = if negative { -magnitude } else { magnitude };

        i64::try_from(signed).map_err(|_| overflow())
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn format_units(units: u64) -> String {
    let one = ONE.unsigned_abs();
    let whole = units / one;
    let frac = units % one;
    if frac == 0 {
        return whole.to_string();
    }
    let fraction = format!("{frac:07}");
    format!("{whole}.{}", fraction.trim_end_matches('0'))
}

/// A ledger amount in minor units.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
)]
/// Ledger amount in minor units (7 decimal digits).
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    pub const MAX: Amount = Amount(i64::MAX);

    pub const fn from_minor(units: i64) -> Self {
        Self(units)
    }

    /// Whole display units, e.g. `Amount::from_units(5)` is 5 XLM.
    pub const fn from_units(units: i64) -> Self {
        Self(units * ONE)
    }

    /// Raw minor units.
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Strict parse of a decimal string.
    pub fn parse(value: &str) -> Result<Self, AmountError> {
        AmountCodec::encode(value, true).map(Self)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn checked_mul(self, factor: i64) -> Option<Amount> {
        self.0.checked_mul(factor).map(Self)
    }

    /// Decimal view with seven fractional digits.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, DECIMALS as u32)
    }

    /// Exact conversion from a decimal, truncating past seven digits.
    pub fn from_decimal(value: Decimal) -> Result<Self, AmountError> {
        Self::parse(&value.to_string())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "-")?;
        }
        write!(f, "{}", format_units(self.0.unsigned_abs()))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as Deserialize>::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_encode_basic() {
        assert_eq!(AmountCodec::encode("10", true).unwrap(), 100_000_000);
        assert_eq!(AmountCodec::encode("0.5", true).unwrap(), 5_000_000);
        assert_eq!(AmountCodec::encode("-1.25", true).unwrap(), -12_500_000);
        assert_eq!(AmountCodec::encode("0.0000001", true).unwrap(), 1);
    }

    #[test]
    fn test_encode_truncates_extra_digits() {
        assert_eq!(AmountCodec::encode("1.123456789", true).unwrap(), 11_234_567);
        assert_eq!(AmountCodec::encode("0.00000009", true).unwrap(), 0);
    }

    #[test]
    fn test_encode_rejects_bad_grammar() {
        for raw in ["", "-", "1.", ".5", "1e5", "+1", "1,5", "abc", "1.2.3", " 1"] {
            assert!(
                matches!(
                    AmountCodec::encode(raw, true),
                    Err(AmountError::InvalidFormat(_))
                ),
                "{raw:?} should be rejected"
            );
            assert_eq!(AmountCodec::encode(raw, false).unwrap(), 0);
        }
    }

    #[test]
    fn test_encode_overflow() {
        let max = "922337203685.4775807";
        assert_eq!(AmountCodec::encode(max, true).unwrap(), i64::MAX);
        assert_eq!(
            AmountCodec::encode("-922337203685.4775808", true).unwrap(),
            i64::MIN
        );

        for raw in [
            "922337203685.4775808",
            "1000000000000",
            "99999999999999999999999999999",
        ] {
            assert!(matches!(
                AmountCodec::encode(raw, true),
                Err(AmountError::Overflow(_))
            ));
            assert_eq!(AmountCodec::encode(raw, false).unwrap(), 0);
        }
    }

    #[test]
    fn test_decode() {
        assert_eq!(AmountCodec::decode(100_000_000).unwrap(), "10");
        assert_eq!(AmountCodec::decode(12_500_000).unwrap(), "1.25");
        assert_eq!(AmountCodec::decode(1).unwrap(), "0.0000001");
        assert_eq!(AmountCodec::decode(0).unwrap(), "0");
        assert_eq!(
            AmountCodec::decode(-1),
            Err(AmountError::InvalidAmount(-1))
        );
    }

    #[test]
    fn test_round_trip_canonicalizes() {
        let cases = [
            ("10.5000000", "10.5"),
            ("007.10", "7.1"),
            ("3.0", "3"),
            ("922337203685.4775807", "922337203685.4775807"),
            ("0.0000010", "0.000001"),
        ];
        for (raw, canonical) in cases {
            let units = AmountCodec::encode(raw, true).unwrap();
            assert_eq!(AmountCodec::decode(units).unwrap(), canonical);
        }
    }

    #[test]
    fn test_amount_display_keeps_sign() {
        assert_eq!(Amount::parse("-2.50").unwrap().to_string(), "-2.5");
        assert_eq!(Amount::from_minor(i64::MIN).to_string(), "-922337203685.4775808");
    }

    #[test]
    fn test_decimal_conversion() {
        let amount = Amount::from_decimal(dec!(16.5)).unwrap();
        assert_eq!(amount.minor(), 165_000_000);
        assert_eq!(amount.to_decimal(), dec!(16.5));
        assert_eq!(
            Amount::from_decimal(dec!(0.123456789)).unwrap().minor(),
            1_234_567
        );
    }

    #[test]
    fn test_amount_serde_as_string() {
        let amount = Amount::from_units(5);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"5\"");
        let back: Amount = serde_json::from_str("\"6.5\"").unwrap();
        assert_eq!(back.minor(), 65_000_000);
    }
}
