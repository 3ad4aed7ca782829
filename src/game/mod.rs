//! Round Resolution Engine
//!
//! Everything that decides an outcome. 100% deterministic: no clock, no
//! floats in the decision path, no hidden state.
//!
//! ## Module Structure
//!
//! - `ladder`: Difficulty multiplier ladders and survival odds
//! - `resolver`: Seeded safe-lane resolver
//! - `collision`: Live collision signal capability
//! - `evaluator`: Jump outcome evaluation and crash classification
//! - `state`: Round aggregate and settlement snapshots
//! - `events`: Events emitted to the presentation layer
//! - `machine`: Round state machine and deferred continuations
//! - `replay`: Rewatch planning from a snapshot
//! - `timeline`: Virtual-clock continuation scheduler
//! - `audit`: Fairness audit of a settled snapshot

pub mod ladder;
pub mod resolver;
pub mod collision;
pub mod evaluator;
pub mod state;
pub mod events;
pub mod machine;
pub mod replay;
pub mod timeline;
pub mod audit;

// Re-export key types
pub use ladder::{Difficulty, SurvivalOdds};
pub use resolver::resolve_max_safe_lanes;
pub use collision::{CollisionProbe, CollisionSignal, NoProbe, ScriptedProbe};
pub use evaluator::{evaluate_jump, resolve_crash_cause, JumpOutcome};
pub use state::{
    CrashCause, CrashSource, Round, RoundOutcome, RoundSnapshot, RoundStatus, SnapshotError,
};
pub use events::{RoundEvent, RoundEventData};
pub use machine::{ConfigError, Continuation, Deferred, RoundSession, StepResult};
pub use replay::{replay, ReplayPlan};
pub use timeline::Timeline;
pub use audit::{audit_snapshot, AuditReport};
