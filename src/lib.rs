//! # Chicken Crossing Server
//!
//! Deterministic round-resolution engine for the Chicken Crossing lane
//! wager game: bet, cross lanes for a growing multiplier, cash out before
//! a vehicle or trap ends the run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  CHICKEN CROSSING SERVER                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - FNV-1a seeded Mulberry32 stream           │
//! │  ├── hash.rs     - FNV-1a and snapshot digests               │
//! │  ├── money.rs    - Fixed-point amounts and multipliers       │
//! │  └── round_id.rs - 256-bit round identifiers                 │
//! │                                                              │
//! │  game/           - Round resolution (deterministic)          │
//! │  ├── ladder.rs   - Difficulty multiplier ladders             │
//! │  ├── resolver.rs - Seeded safe-lane resolver                 │
//! │  ├── evaluator.rs- Jump outcome and crash classification     │
//! │  ├── machine.rs  - Round state machine                       │
//! │  ├── replay.rs   - Rewatch from a snapshot                   │
//! │  └── timeline.rs - Virtual-clock scheduler                   │
//! │                                                              │
//! │  session/        - Outer shell (non-deterministic)           │
//! │  ├── driver.rs   - Tokio timer driver                        │
//! │  └── history.rs  - History and share tokens                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in outcome logic
//! - No HashMap (uses BTreeMap/BTreeSet for sorted iteration)
//! - No system time dependencies
//! - All randomness from the seeded Mulberry32 stream
//!
//! Given the same round id and difficulty, the safe-lane count and every
//! fallback crash cause are identical on any platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod session;

// Re-export commonly used types
pub use crate::config::{SessionConfig, Timings};
pub use crate::core::money::{Amount, Multiplier};
pub use crate::core::round_id::RoundId;
pub use crate::game::ladder::Difficulty;
pub use crate::game::machine::{RoundSession, StepResult};
pub use crate::game::state::{Round, RoundOutcome, RoundSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// House edge applied at the first lane (percent kept by the house).
pub const HOUSE_EDGE_PERCENT: u64 =
    game::ladder::HOUSE_EDGE_DENOMINATOR - game::ladder::HOUSE_EDGE_NUMERATOR;
