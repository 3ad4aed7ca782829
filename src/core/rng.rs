//! Deterministic Random Number Generator
//!
//! A Mulberry32 stream seeded by the FNV-1a hash of a seed string.
//! Both halves are pure 32-bit integer arithmetic, so the stream is
//! identical on every platform and in every implementation that follows
//! the same construction.

use serde::{Deserialize, Serialize};

use super::hash::hash_string32;

/// Mulberry32 state increment (Weyl sequence constant).
const MULBERRY_INCREMENT: u32 = 0x6D2B_79F5;

/// 2^32 as f64, for mapping draws into [0, 1).
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Deterministic PRNG driving the safe-lane walk.
///
/// # Determinism Guarantee
///
/// Given the same seed, this generator produces the exact same sequence
/// of values on any platform.
///
/// # Example
///
/// ```
/// use chicken_crossing::core::rng::SeededRandom;
///
/// let mut rng = SeededRandom::new(42);
/// assert_eq!(rng.next_u32(), 2581720956); // Always the same!
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    /// Create a generator from a raw 32-bit state.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Create a generator from a seed string (FNV-1a of its bytes).
    pub fn from_seed_str(seed: &str) -> Self {
        Self::new(hash_string32(seed))
    }

    /// Generate the next 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t));
        t ^ (t >> 14)
    }

    /// Generate a uniform value in [0, 1).
    ///
    /// Display and diagnostics only; decisions compare the raw u32.
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 / TWO_POW_32
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }
}
