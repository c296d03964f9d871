//! Amount normalization
//!
//! Converts user-entered decimal strings to integer minor units and back.
//! Inputs with more fractional digits than the asset supports are rejected,
//! never rounded.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BelowMinimumError, InvalidAmountError};
use crate::types::BridgeDirection;

/// Decimal places of USDC (Ethereum) and USDCx (Stacks)
pub const USDC_DECIMALS: u8 = 6;

/// Fractional digits always shown when formatting
const MIN_DISPLAY_FRACTION_DIGITS: usize = 2;

/// Amount in the asset's smallest unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MinorAmount(u128);

impl MinorAmount {
    pub const ZERO: MinorAmount = MinorAmount(0);

    pub const fn new(units: u128) -> Self {
        MinorAmount(units)
    }

    pub const fn units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a USDC decimal string
    pub fn from_decimal(amount: &str) -> Result<Self, InvalidAmountError> {
        to_minor_units(amount, USDC_DECIMALS)
    }

    /// Narrow to `u64` for encodings that carry 64-bit amounts
    pub fn to_u64(&self) -> Result<u64, InvalidAmountError> {
        u64::try_from(self.0).map_err(|_| InvalidAmountError::Overflow)
    }
}

impl From<u64> for MinorAmount {
    fn from(units: u64) -> Self {
        MinorAmount(units as u128)
    }
}

impl fmt::Display for MinorAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_decimal_string(*self, USDC_DECIMALS))
    }
}

// JSON numbers lose precision above 2^53, so minor units travel as strings.
impl Serialize for MinorAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for MinorAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u128>()
            .map(MinorAmount)
            .map_err(serde::de::Error::custom)
    }
}

/// Convert a positive decimal string into minor units
///
/// Accepts `"5"`, `"5.00"`, `"0.000001"`. Rejects signs, exponents, empty
/// integer or fractional parts (`".5"`, `"5."`), zero, and anything with more
/// than `decimals` fractional digits.
pub fn to_minor_units(amount: &str, decimals: u8) -> Result<MinorAmount, InvalidAmountError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(InvalidAmountError::Empty);
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (amount, None),
    };

    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(whole) || fraction.is_some_and(|f| !is_digits(f)) {
        return Err(InvalidAmountError::Malformed(amount.to_string()));
    }

    let fraction = fraction.unwrap_or("");
    if fraction.len() > decimals as usize {
        return Err(InvalidAmountError::TooManyFractionalDigits {
            max: decimals,
            got: fraction.len(),
        });
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or(InvalidAmountError::Overflow)?;
    let whole_units = whole
        .parse::<u128>()
        .map_err(|_| InvalidAmountError::Overflow)?
        .checked_mul(scale)
        .ok_or(InvalidAmountError::Overflow)?;

    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction_units = if padded.is_empty() {
        0
    } else {
        padded
            .parse::<u128>()
            .map_err(|_| InvalidAmountError::Malformed(amount.to_string()))?
    };

    let total = whole_units
        .checked_add(fraction_units)
        .ok_or(InvalidAmountError::Overflow)?;
    if total == 0 {
        return Err(InvalidAmountError::NotPositive);
    }

    Ok(MinorAmount(total))
}

/// Format minor units as a decimal string
///
/// Trailing zeros are trimmed but at least two fractional digits are kept,
/// so `5000000` at 6 decimals renders as `"5.00"` and `1123456` as
/// `"1.123456"`.
pub fn to_decimal_string(amount: MinorAmount, decimals: u8) -> String {
    if decimals == 0 {
        return amount.0.to_string();
    }

    let digits = format!("{:0>width$}", amount.0, width = decimals as usize + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals as usize);

    let keep = MIN_DISPLAY_FRACTION_DIGITS.min(fraction.len());
    let trimmed = fraction.trim_end_matches('0');
    let fraction = if trimmed.len() < keep {
        &fraction[..keep]
    } else {
        trimmed
    };

    format!("{}.{}", whole, fraction)
}

/// Direction-specific minimum amounts
///
/// Withdrawals carry a higher minimum because the destination side deducts
/// a fixed attestation fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountPolicy {
    pub decimals: u8,
    pub deposit_minimum: MinorAmount,
    pub withdrawal_minimum: MinorAmount,
}

impl Default for AmountPolicy {
    fn default() -> Self {
        Self {
            decimals: USDC_DECIMALS,
            deposit_minimum: MinorAmount::new(1_000_000),
            withdrawal_minimum: MinorAmount::new(4_800_000),
        }
    }
}

impl AmountPolicy {
    pub fn minimum_for(&self, direction: BridgeDirection) -> MinorAmount {
        match direction {
            BridgeDirection::Deposit => self.deposit_minimum,
            BridgeDirection::Withdrawal => self.withdrawal_minimum,
        }
    }

    pub fn enforce_minimum(
        &self,
        amount: MinorAmount,
        direction: BridgeDirection,
    ) -> Result<(), BelowMinimumError> {
        let minimum = self.minimum_for(direction);
        if amount < minimum {
            return Err(BelowMinimumError {
                direction,
                amount,
                minimum,
            });
        }
        Ok(())
    }

    /// Parse a decimal string at this policy's precision
    pub fn parse(&self, amount: &str) -> Result<MinorAmount, InvalidAmountError> {
        to_minor_units(amount, self.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units_accepts_max_precision() {
        assert_eq!(to_minor_units("1.123456", 6).unwrap().units(), 1_123_456);
        assert_eq!(to_minor_units("5", 6).unwrap().units(), 5_000_000);
        assert_eq!(to_minor_units("5.00", 6).unwrap().units(), 5_000_000);
        assert_eq!(to_minor_units("0.000001", 6).unwrap().units(), 1);
        assert_eq!(to_minor_units(" 4.8 ", 6).unwrap().units(), 4_800_000);
    }

    #[test]
    fn test_to_minor_units_rejects_excess_precision() {
        assert_eq!(
            to_minor_units("1.1234567", 6),
            Err(InvalidAmountError::TooManyFractionalDigits { max: 6, got: 7 })
        );
    }

    #[test]
    fn test_to_minor_units_rejects_malformed() {
        for input in ["-1", "+1", "1e6", "1,5", ".5", "5.", "abc", "1.2.3", "0x10"] {
            assert!(
                matches!(
                    to_minor_units(input, 6),
                    Err(InvalidAmountError::Malformed(_))
                ),
                "expected {input:?} to be rejected"
            );
        }
        assert_eq!(to_minor_units("", 6), Err(InvalidAmountError::Empty));
        assert_eq!(to_minor_units("   ", 6), Err(InvalidAmountError::Empty));
    }

    #[test]
    fn test_to_minor_units_rejects_zero() {
        assert_eq!(to_minor_units("0", 6), Err(InvalidAmountError::NotPositive));
        assert_eq!(
            to_minor_units("0.000000", 6),
            Err(InvalidAmountError::NotPositive)
        );
    }

    #[test]
    fn test_to_minor_units_overflow() {
        let huge = "9".repeat(40);
        assert_eq!(to_minor_units(&huge, 6), Err(InvalidAmountError::Overflow));
    }

    #[test]
    fn test_to_decimal_string() {
        assert_eq!(to_decimal_string(MinorAmount::new(5_000_000), 6), "5.00");
        assert_eq!(to_decimal_string(MinorAmount::new(1_123_456), 6), "1.123456");
        assert_eq!(to_decimal_string(MinorAmount::new(4_790_000), 6), "4.79");
        assert_eq!(to_decimal_string(MinorAmount::new(1), 6), "0.000001");
        assert_eq!(to_decimal_string(MinorAmount::ZERO, 6), "0.00");
        assert_eq!(to_decimal_string(MinorAmount::new(1_230_000_000), 6), "1230.00");
        assert_eq!(to_decimal_string(MinorAmount::new(42), 0), "42");
    }

    #[test]
    fn test_enforce_minimum_boundaries() {
        let policy = AmountPolicy::default();

        assert!(policy
            .enforce_minimum(MinorAmount::new(1_000_000), BridgeDirection::Deposit)
            .is_ok());
        assert!(policy
            .enforce_minimum(MinorAmount::new(999_999), BridgeDirection::Deposit)
            .is_err());

        let exact = policy.parse("4.80").unwrap();
        assert!(policy
            .enforce_minimum(exact, BridgeDirection::Withdrawal)
            .is_ok());

        let below = policy.parse("4.79").unwrap();
        let err = policy
            .enforce_minimum(below, BridgeDirection::Withdrawal)
            .unwrap_err();
        assert_eq!(err.minimum, MinorAmount::new(4_800_000));
        assert_eq!(err.amount, MinorAmount::new(4_790_000));
    }

    #[test]
    fn test_deposit_minimum_below_withdrawal_minimum() {
        let policy = AmountPolicy::default();
        assert!(
            policy.minimum_for(BridgeDirection::Deposit)
                < policy.minimum_for(BridgeDirection::Withdrawal)
        );
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&MinorAmount::new(5_000_000)).unwrap();
        assert_eq!(json, "\"5000000\"");
        let back: MinorAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, MinorAmount::new(5_000_000));
    }

    #[test]
    fn test_to_u64() {
        assert_eq!(MinorAmount::new(5).to_u64(), Ok(5));
        assert_eq!(
            MinorAmount::new(u64::MAX as u128 + 1).to_u64(),
            Err(InvalidAmountError::Overflow)
        );
    }
}
