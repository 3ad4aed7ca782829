//! Replay Engine
//!
//! Rebuilds the lane-by-lane path of a settled round from its snapshot.
//! Only timing is derived here; the outcome, crash cause and safe-lane
//! count are taken from the snapshot as recorded and are never recomputed
//! from the seed or from live geometry.

use std::time::Duration;

use crate::config::Timings;
use crate::game::state::{CrashCause, RoundSnapshot};

/// One step of a rewatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayStep {
    /// Lane stepped onto.
    pub lane: u32,
    /// Offset from the start of the rewatch.
    pub at: Duration,
    /// Show this step as a vehicle strike.
    pub vehicle_strike: bool,
}

/// Full rewatch schedule for one snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayPlan {
    /// Steps in lane order, lanes 1 through the final lane.
    pub steps: Vec<ReplayStep>,
    /// Offset at which the recorded outcome is shown.
    pub finish_at: Duration,
    /// The record being replayed.
    pub snapshot: RoundSnapshot,
}

impl ReplayPlan {
    /// A round that ended on lane 0 has nothing to animate.
    pub fn is_immediate(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Plan the rewatch of `snapshot`.
///
/// One step is planned per lane, so the record should have passed
/// `RoundSnapshot::validate` first; `RoundSession::rewatch_snapshot` does
/// this.
pub fn replay(snapshot: &RoundSnapshot, timings: &Timings) -> ReplayPlan {
    let final_lane = snapshot.final_lane;

    // A vehicle crash inside the safe range can only come from live
    // geometry, so the last step shows the strike.
    let live_strike = snapshot.crash_cause == Some(CrashCause::Vehicle)
        && final_lane <= snapshot.max_safe_lanes;

    let steps: Vec<ReplayStep> = (1..=final_lane)
        .map(|lane| ReplayStep {
            lane,
            at: timings.rewatch_step * lane,
            vehicle_strike: live_strike && lane == final_lane,
        })
        .collect();

    let finish_at = steps
        .last()
        .map(|last| last.at + timings.jump)
        .unwrap_or(Duration::ZERO);

    ReplayPlan {
        steps,
        finish_at,
        snapshot: snapshot.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::Amount;
    use crate::core::round_id::RoundId;
    use crate::game::ladder::Difficulty;
    use crate::game::state::{CrashSource, RoundOutcome};

    fn snapshot(final_lane: u32, max_safe: u32, outcome: RoundOutcome, cause: Option<CrashCause>) -> RoundSnapshot {
        RoundSnapshot {
            round_id: RoundId::from_u64(11),
            bet: Amount::from_units(2),
            difficulty: Difficulty::Hard,
            max_safe_lanes: max_safe,
            final_lane,
            payout_lane: final_lane.min(max_safe),
            payout: Amount::ZERO,
            outcome,
            crash_cause: cause,
            crash_source: cause.map(|_| CrashSource::SeededFallback),
        }
    }

    #[test]
    fn test_steps_cover_every_lane() {
        let timings = Timings::default();
        let plan = replay(&snapshot(3, 5, RoundOutcome::CashedOut, None), &timings);
        let lanes: Vec<u32> = plan.steps.iter().map(|s| s.lane).collect();
        assert_eq!(lanes, vec![1, 2, 3]);
        assert_eq!(plan.steps[0].at, Duration::from_millis(420));
        assert_eq!(plan.steps[2].at, Duration::from_millis(1260));
        assert_eq!(plan.finish_at, Duration::from_millis(1660));
        assert!(plan.steps.iter().all(|s| !s.vehicle_strike));
    }

    #[test]
    fn test_zero_lane_is_immediate() {
        let plan = replay(
            &snapshot(0, 0, RoundOutcome::Crashed, Some(CrashCause::Trap)),
            &Timings::default(),
        );
        assert!(plan.is_immediate());
        assert_eq!(plan.finish_at, Duration::ZERO);
    }

    #[test]
    fn test_live_strike_flagged_on_last_step() {
        let plan = replay(
            &snapshot(2, 4, RoundOutcome::Crashed, Some(CrashCause::Vehicle)),
            &Timings::default(),
        );
        assert!(!plan.steps[0].vehicle_strike);
        assert!(plan.steps[1].vehicle_strike);
    }

    #[test]
    fn test_fallback_vehicle_not_flagged() {
        let plan = replay(
            &snapshot(5, 4, RoundOutcome::Crashed, Some(CrashCause::Vehicle)),
            &Timings::default(),
        );
        assert!(plan.steps.iter().all(|s| !s.vehicle_strike));
    }

    #[test]
    fn test_plan_keeps_recorded_outcome() {
        let recorded = snapshot(4, 3, RoundOutcome::Crashed, Some(CrashCause::Trap));
        let plan = replay(&recorded, &Timings::instant());
        assert_eq!(plan.snapshot, recorded);
        assert_eq!(plan.steps.len(), 4);
    }
}
