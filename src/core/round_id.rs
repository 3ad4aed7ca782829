//! Round Identifiers
//!
//! A round is keyed by a 256-bit integer, stored big-endian. The
//! identifier only ever feeds seed strings, so its canonical text form
//! (lowercase hex, no leading zeros) is part of the determinism contract.

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique round identifier (256-bit, big-endian).
///
/// Implements Ord for deterministic BTreeMap ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId(pub [u8; 32]);

impl RoundId {
    /// Create from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh identifier from the OS random source.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from a small integer (tests, fixtures).
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Canonical seed form: lowercase hex without leading zeros.
    pub fn to_hex(&self) -> String {
        let full = hex::encode(self.0);
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Parse hex digits (no prefix). Leading zeros are accepted.
    pub fn from_hex(digits: &str) -> Result<Self, RoundIdError> {
        if digits.is_empty() {
            return Err(RoundIdError::Empty);
        }
        let significant = digits.trim_start_matches('0');
        if significant.len() > 64 {
            return Err(RoundIdError::Overflow);
        }

        let padded = format!("{:0>64}", significant);
        let decoded = hex::decode(&padded).map_err(|_| RoundIdError::InvalidDigit)?;

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// Parse decimal digits.
    pub fn from_decimal(digits: &str) -> Result<Self, RoundIdError> {
        if digits.is_empty() {
            return Err(RoundIdError::Empty);
        }

        let mut bytes = [0u8; 32];
        for c in digits.chars() {
            let digit = c.to_digit(10).ok_or(RoundIdError::InvalidDigit)?;

            // bytes = bytes * 10 + digit
            let mut carry = digit;
            for byte in bytes.iter_mut().rev() {
                let value = *byte as u32 * 10 + carry;
                *byte = (value & 0xff) as u8;
                carry = value >> 8;
            }
            if carry != 0 {
                return Err(RoundIdError::Overflow);
            }
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

/// Accepts `0x`-prefixed hex or plain decimal, like a shared `?id=` value.
impl FromStr for RoundId {
    type Err = RoundIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => Self::from_hex(digits),
            None => Self::from_decimal(s),
        }
    }
}

/// Errors parsing a [`RoundId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundIdError {
    /// No digits.
    #[error("round id is empty")]
    Empty,
    /// A character outside the radix.
    #[error("round id contains an invalid digit")]
    InvalidDigit,
    /// Value exceeds 256 bits.
    #[error("round id exceeds 256 bits")]
    Overflow,
}
