//! Integer Money and Multipliers
//!
//! No floating point in the payout path. Amounts are counted in
//! thousandths (payouts settle to 3 decimal places) and multipliers in
//! hundredths (the ladder tables are 2-dp values), so
//! `amount × multiplier` is exact before the final half-up rounding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Thousandths per whole unit.
pub const AMOUNT_SCALE: u64 = 1_000;

/// Hundredths per 1.00x.
pub const MULTIPLIER_SCALE: u32 = 100;

/// A non-negative monetary amount with 3 decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(0);

    /// Create from a count of thousandths.
    pub const fn from_thousandths(thousandths: u64) -> Self {
        Self(thousandths)
    }

    /// Create from whole units.
    pub const fn from_units(units: u64) -> Self {
        Self(units.saturating_mul(AMOUNT_SCALE))
    }

    /// Raw thousandths.
    pub const fn thousandths(self) -> u64 {
        self.0
    }

    /// Is this amount zero?
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Subtract, clamping at zero.
    pub const fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Add, clamping at the maximum.
    pub const fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Apply a multiplier, rounding half-up to 3 decimal places.
    pub fn scale(self, multiplier: Multiplier) -> Amount {
        let raw = self.0 as u128 * multiplier.hundredths() as u128;
        let half = (MULTIPLIER_SCALE / 2) as u128;
        let rounded = (raw + half) / MULTIPLIER_SCALE as u128;
        Amount(u64::try_from(rounded).unwrap_or(u64::MAX))
    }

    /// Lossy conversion for display.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / AMOUNT_SCALE as f64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0 / AMOUNT_SCALE, self.0 % AMOUNT_SCALE)
    }
}

/// Errors parsing an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Input was empty.
    #[error("amount is empty")]
    Empty,
    /// Input contained something other than digits and one decimal point.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// More than 3 decimal places.
    #[error("amount has more than 3 decimal places: {0}")]
    TooPrecise(String),
    /// Value does not fit.
    #[error("amount too large: {0}")]
    Overflow(String),
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if frac.len() > 3 {
            return Err(AmountError::TooPrecise(s.to_string()));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| AmountError::Overflow(s.to_string()))?
        };
        let mut frac_value: u64 = 0;
        for (i, b) in frac.bytes().enumerate() {
            frac_value += (b - b'0') as u64 * 10u64.pow(2 - i as u32);
        }

        whole
            .checked_mul(AMOUNT_SCALE)
            .and_then(|w| w.checked_add(frac_value))
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

/// A payout multiplier with 2 decimal places.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Multiplier(u32);

impl Multiplier {
    /// 0.00x (nothing at stake yet).
    pub const ZERO: Multiplier = Multiplier(0);

    /// Create from a count of hundredths.
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    /// Raw hundredths.
    pub const fn hundredths(self) -> u32 {
        self.0
    }

    /// Lossy conversion for display.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / MULTIPLIER_SCALE as f64
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / MULTIPLIER_SCALE, self.0 % MULTIPLIER_SCALE)
    }
}
