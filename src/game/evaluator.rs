//! Jump Outcome Evaluator
//!
//! Decides a single lane advance from the pre-resolved safe lanes and the
//! live collision samples taken during the jump. Classifies crashes as
//! vehicle strikes or traps; when live geometry says nothing, a seeded
//! hash decides.

use crate::core::hash::hash_string32;
use crate::core::round_id::RoundId;
use crate::game::collision::FlightSamples;
use crate::game::ladder::Difficulty;
use crate::game::state::{AttributedCrash, CrashCause, CrashSource, Round};

/// Suffix of the fallback classifier's seed string.
pub const CRASH_PRESENTATION_TAG: &str = "crash-presentation";

/// Result of evaluating one jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpOutcome {
    /// Landed safely; round stays active.
    Advance {
        /// Lane landed on.
        lane: u32,
    },
    /// Crashed on the attempted lane.
    Crash(AttributedCrash),
    /// Crossed the last lane.
    Finish {
        /// Lane the player ends on (the finish lane).
        final_lane: u32,
        /// Lane the payout is computed at.
        payout_lane: u32,
    },
}

impl JumpOutcome {
    /// Does this outcome end the round?
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JumpOutcome::Advance { .. })
    }
}

/// Seed string for the fallback classifier.
pub fn crash_presentation_seed(round_id: &RoundId, lane: u32, difficulty: Difficulty) -> String {
    format!(
        "{}:{}:{}:{}",
        round_id.to_hex(),
        difficulty.name(),
        lane,
        CRASH_PRESENTATION_TAG
    )
}

/// Deterministic crash cause for a lane: bit 0 of the seed hash,
/// 0 for a vehicle and 1 for a trap.
pub fn resolve_crash_cause(round_id: &RoundId, lane: u32, difficulty: Difficulty) -> CrashCause {
    let hash = hash_string32(&crash_presentation_seed(round_id, lane, difficulty));
    if hash & 1 == 0 {
        CrashCause::Vehicle
    } else {
        CrashCause::Trap
    }
}

/// Evaluate the jump to `round.current_lane() + 1`.
///
/// Pure with respect to the round: the caller records any crash with
/// `Round::attribute_crash`. A crash already attributed to the target lane
/// is returned unchanged.
pub fn evaluate_jump(round: &Round, samples: FlightSamples) -> JumpOutcome {
    let difficulty = round.difficulty();
    let max_safe = round.max_safe_lanes();
    let next = round.current_lane() + 1;

    if let Some(existing) = round.attributed_crash() {
        if existing.lane == next {
            return JumpOutcome::Crash(existing);
        }
    }

    // Live geometry overrides a safe lane.
    if next <= max_safe && samples.landing.is_hit() {
        return JumpOutcome::Crash(AttributedCrash {
            lane: next,
            cause: CrashCause::Vehicle,
            source: CrashSource::LiveCollision,
        });
    }

    if next > max_safe && next <= difficulty.max_safe_lanes() {
        let crash = if samples.touched() {
            AttributedCrash {
                lane: next,
                cause: CrashCause::Vehicle,
                source: CrashSource::LiveCollision,
            }
        } else {
            AttributedCrash {
                lane: next,
                cause: resolve_crash_cause(round.id(), next, difficulty),
                source: CrashSource::SeededFallback,
            }
        };
        return JumpOutcome::Crash(crash);
    }

    if next >= difficulty.finish_lane() {
        return JumpOutcome::Finish {
            final_lane: difficulty.finish_lane(),
            payout_lane: max_safe,
        };
    }

    JumpOutcome::Advance { lane: next }
}
