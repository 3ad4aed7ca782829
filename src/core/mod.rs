//! Core deterministic primitives.
//!
//! Everything in this module is a pure function of its inputs and produces
//! identical results on every platform. Round outcomes are derived from
//! these building blocks only.

pub mod hash;
pub mod money;
pub mod rng;
pub mod round_id;

// Re-export core types
pub use hash::{hash_string32, DigestHasher, SnapshotDigest};
pub use money::{Amount, AmountError, Multiplier};
pub use rng::SeededRandom;
pub use round_id::{RoundId, RoundIdError};
