//! Fixed-point amounts denominated in a currency's smallest unit.

use express_error::{ExpressError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a blockchain amount with arbitrary precision.
///
/// This type wraps the smallest unit of a cryptocurrency (e.g., wei, satoshi, lamport)
/// and provides methods for conversion to human-readable units. Amounts are
/// unsigned, so a negative quantity can never reach the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// The value in the smallest unit of the currency
    pub value: u128,
    /// Number of decimal places for the currency (e.g., 18 for ETH, 8 for BTC)
    pub decimals: u8,
}

impl Amount {
    /// Creates a new Amount from the smallest unit value
    pub fn from_smallest_unit(value: u128, decimals: u8) -> Self {
        Self { value, decimals }
    }

    /// Parses a human-readable decimal string such as `"0.015"`.
    ///
    /// Rejects negative values, more fractional digits than `decimals`,
    /// and anything that overflows `u128`.
    pub fn from_decimal_str(input: &str, decimals: u8) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ExpressError::InvalidAmount("empty amount".to_string()));
        }
        if trimmed.starts_with('-') {
            return Err(ExpressError::InvalidAmount(format!(
                "negative amount: {}",
                trimmed
            )));
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if fraction.len() > decimals as usize {
            return Err(ExpressError::InvalidAmount(format!(
                "{} has more than {} decimal places",
                trimmed, decimals
            )));
        }
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(ExpressError::InvalidAmount(format!("malformed amount: {}", trimmed)));
        }

        let overflow = || ExpressError::InvalidAmount(format!("amount overflow: {}", trimmed));
        let scale = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;
        let whole_value = if whole.is_empty() { 0 } else { whole.parse::<u128>()? };
        let fraction_value = if fraction.is_empty() {
            0
        } else {
            let padding = 10u128.pow((decimals as usize - fraction.len()) as u32);
            fraction.parse::<u128>()?.checked_mul(padding).ok_or_else(overflow)?
        };

        let value = whole_value
            .checked_mul(scale)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or_else(overflow)?;
        Ok(Self { value, decimals })
    }

    /// Returns the value in the smallest unit
    pub fn smallest_unit(&self) -> u128 {
        self.value
    }

    /// Returns the value in human-readable form
    pub fn human_readable(&self) -> f64 {
        self.value as f64 / 10f64.powi(self.decimals as i32)
    }

    /// Returns zero amount with the specified decimals
    pub fn zero(decimals: u8) -> Self {
        Self { value: 0, decimals }
    }

    /// Largest representable amount, used for unlimited allowances
    pub fn max(decimals: u8) -> Self {
        Self {
            value: u128::MAX,
            decimals,
        }
    }

    /// Checks if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Adds two amounts of the same currency
    pub fn checked_add(&self, other: Amount) -> Option<Amount> {
        if self.decimals != other.decimals {
            return None;
        }
        self.value
            .checked_add(other.value)
            .map(|value| Amount::from_smallest_unit(value, self.decimals))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decimals == 0 {
            return write!(f, "{}", self.value);
        }
        if self.decimals > 38 {
            return write!(f, "{}e-{}", self.value, self.decimals);
        }
        let scale = 10u128.pow(self.decimals as u32);
        let whole = self.value / scale;
        let fraction = self.value % scale;
        let digits = format!("{:0width$}", fraction, width = self.decimals as usize);
        let digits = digits.trim_end_matches('0');
        if digits.is_empty() {
            write!(f, "{}", whole)
        } else {
            write!(f, "{}.{}", whole, digits)
        }
    }
}
