//! Seeded Safe-Lane Resolver
//!
//! Maps (round id, difficulty) to the number of consecutive safe lanes.
//! Pure: no clock, no call-order dependence, no external state. Called
//! once per round at start; the result is never recomputed mid-round.

#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::core::rng::SeededRandom;
use crate::core::round_id::RoundId;
use crate::game::ladder::Difficulty;

/// Namespace tag prefixed to every resolver seed.
pub const RESOLVER_NAMESPACE: &str = "chicken-crossing";

/// Seed string for the safe-lane walk: `chicken-crossing:{hex}:{Difficulty}`.
pub fn resolver_seed(round_id: &RoundId, difficulty: Difficulty) -> String {
    format!("{}:{}:{}", RESOLVER_NAMESPACE, round_id.to_hex(), difficulty.name())
}

/// Resolve the safe-lane count for a round.
///
/// Walks steps 1, 2, 3, ... drawing one value per step; the walk stops at
/// the first draw that exceeds that step's survival odds.
///
/// # Determinism
///
/// Identical inputs always yield the identical output, and the result is
/// always in `[0, difficulty.max_safe_lanes()]`.
pub fn resolve_max_safe_lanes(round_id: &RoundId, difficulty: Difficulty) -> u32 {
    resolve_max_safe_lanes_capped(round_id, difficulty, difficulty.max_safe_lanes())
}

/// Resolve with an explicit lane cap (never above the ladder length).
pub fn resolve_max_safe_lanes_capped(round_id: &RoundId, difficulty: Difficulty, cap: u32) -> u32 {
    let mut rng = SeededRandom::from_seed_str(&resolver_seed(round_id, difficulty));
    let lane_cap = cap.min(difficulty.max_safe_lanes());

    let mut safe_lanes = 0;
    while safe_lanes < lane_cap {
        let step = safe_lanes + 1;
        let draw = rng.next_u32();

        #[cfg(feature = "debug-tracing")]
        trace!(step, draw, "safe-lane draw");

        if !difficulty.survival_odds(step).admits(draw) {
            break;
        }
        safe_lanes = step;
    }

    safe_lanes
}
