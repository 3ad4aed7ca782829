//! Fairness Audit
//!
//! Operator-side check of a settled snapshot against the seed. Replay
//! never calls this: a rewatch trusts the record. The audit re-runs the
//! resolver and the fallback classifier and reports every field of the
//! record that the seed does not reproduce.

use thiserror::Error;

use crate::game::evaluator::resolve_crash_cause;
use crate::game::resolver::resolve_max_safe_lanes;
use crate::game::state::{compute_payout, CrashCause, CrashSource, RoundOutcome, RoundSnapshot};

/// How the crash cause was checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CauseAudit {
    /// Not a crash.
    NotApplicable,
    /// Fallback cause reproduced from the seed.
    Reproduced,
    /// Decided by live geometry; the seed cannot confirm it.
    NotSeedDerivable,
}

/// Audit outcome.
#[derive(Debug)]
pub struct AuditReport {
    /// Did every seed-derivable field match?
    pub valid: bool,

    /// Safe lanes the seed resolves to.
    pub computed_max_safe_lanes: u32,

    /// Crash cause check.
    pub cause: CauseAudit,

    /// Every mismatch found.
    pub errors: Vec<AuditError>,
}

/// A field of the record the seed does not reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    /// Recorded safe lanes differ from the resolver.
    #[error("max safe lanes mismatch: recorded {recorded}, seed gives {computed}")]
    MaxSafeLanesMismatch {
        /// Safe lanes in the record.
        recorded: u32,
        /// Safe lanes the resolver gives.
        computed: u32,
    },

    /// Fallback crash cause differs from the classifier.
    #[error("crash cause mismatch on lane {lane}: recorded {recorded:?}, seed gives {computed:?}")]
    CrashCauseMismatch {
        /// Crash lane.
        lane: u32,
        /// Cause in the record.
        recorded: CrashCause,
        /// Cause the classifier gives.
        computed: CrashCause,
    },

    /// Payout or payout lane differs from the payout rule.
    #[error("payout mismatch")]
    PayoutMismatch,

    /// Final lane impossible for the recorded outcome.
    #[error("final lane {final_lane} inconsistent with {outcome:?}")]
    LaneMismatch {
        /// Recorded final lane.
        final_lane: u32,
        /// Recorded outcome.
        outcome: RoundOutcome,
    },

    /// Crash record without cause or source.
    #[error("crash record incomplete")]
    IncompleteCrash,
}

/// Audit `snapshot` against its seed.
pub fn audit_snapshot(snapshot: &RoundSnapshot) -> AuditReport {
    let difficulty = snapshot.difficulty;
    let computed = resolve_max_safe_lanes(&snapshot.round_id, difficulty);
    let mut errors = Vec::new();

    if computed != snapshot.max_safe_lanes {
        errors.push(AuditError::MaxSafeLanesMismatch {
            recorded: snapshot.max_safe_lanes,
            computed,
        });
    }

    let (payout_lane, payout) = compute_payout(
        snapshot.bet,
        difficulty,
        snapshot.max_safe_lanes,
        snapshot.final_lane,
        snapshot.outcome,
    );
    if payout_lane != snapshot.payout_lane || payout != snapshot.payout {
        errors.push(AuditError::PayoutMismatch);
    }

    let final_lane = snapshot.final_lane;
    if !snapshot.lane_consistent() {
        errors.push(AuditError::LaneMismatch {
            final_lane,
            outcome: snapshot.outcome,
        });
    }

    let cause = match (snapshot.outcome, snapshot.crash_cause, snapshot.crash_source) {
        (RoundOutcome::Crashed, Some(recorded), Some(CrashSource::SeededFallback)) => {
            let computed = resolve_crash_cause(&snapshot.round_id, final_lane, difficulty);
            if computed != recorded {
                errors.push(AuditError::CrashCauseMismatch {
                    lane: final_lane,
                    recorded,
                    computed,
                });
            }
            CauseAudit::Reproduced
        }
        (RoundOutcome::Crashed, Some(_), Some(CrashSource::LiveCollision)) => {
            CauseAudit::NotSeedDerivable
        }
        (RoundOutcome::Crashed, _, _) => {
            errors.push(AuditError::IncompleteCrash);
            CauseAudit::NotApplicable
        }
        _ => CauseAudit::NotApplicable,
    };

    AuditReport {
        valid: errors.is_empty(),
        computed_max_safe_lanes: computed,
        cause,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::Amount;
    use crate::core::round_id::RoundId;
    use crate::game::ladder::Difficulty;

    fn trap_on_lane_six() -> RoundSnapshot {
        // id 1 on Medium: five safe lanes, lane 6 falls back to a trap.
        RoundSnapshot {
            round_id: RoundId::from_u64(1),
            bet: Amount::from_units(10),
            difficulty: Difficulty::Medium,
            max_safe_lanes: 5,
            final_lane: 6,
            payout_lane: 5,
            payout: Amount::ZERO,
            outcome: RoundOutcome::Crashed,
            crash_cause: Some(CrashCause::Trap),
            crash_source: Some(CrashSource::SeededFallback),
        }
    }

    #[test]
    fn test_honest_crash_passes() {
        let report = audit_snapshot(&trap_on_lane_six());
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.cause, CauseAudit::Reproduced);
        assert_eq!(report.computed_max_safe_lanes, 5);
    }

    #[test]
    fn test_flipped_cause_detected() {
        let snapshot = RoundSnapshot {
            crash_cause: Some(CrashCause::Vehicle),
            ..trap_on_lane_six()
        };
        let report = audit_snapshot(&snapshot);
        assert!(!report.valid);
        assert_eq!(
            report.errors,
            vec![AuditError::CrashCauseMismatch {
                lane: 6,
                recorded: CrashCause::Vehicle,
                computed: CrashCause::Trap,
            }]
        );
    }

    #[test]
    fn test_inflated_safe_lanes_detected() {
        let snapshot = RoundSnapshot {
            max_safe_lanes: 9,
            final_lane: 9,
            payout_lane: 9,
            payout: Amount::from_thousandths(67_700),
            outcome: RoundOutcome::CashedOut,
            crash_cause: None,
            crash_source: None,
            ..trap_on_lane_six()
        };
        let report = audit_snapshot(&snapshot);
        assert_eq!(
            report.errors,
            vec![AuditError::MaxSafeLanesMismatch {
                recorded: 9,
                computed: 5,
            }]
        );
    }

    #[test]
    fn test_live_collision_not_seed_derivable() {
        let snapshot = RoundSnapshot {
            final_lane: 2,
            payout_lane: 2,
            crash_cause: Some(CrashCause::Vehicle),
            crash_source: Some(CrashSource::LiveCollision),
            ..trap_on_lane_six()
        };
        let report = audit_snapshot(&snapshot);
        assert!(report.valid);
        assert_eq!(report.cause, CauseAudit::NotSeedDerivable);
    }

    #[test]
    fn test_tampered_payout_detected() {
        let snapshot = RoundSnapshot {
            payout: Amount::from_units(5),
            ..trap_on_lane_six()
        };
        let report = audit_snapshot(&snapshot);
        assert_eq!(report.errors, vec![AuditError::PayoutMismatch]);
    }

    #[test]
    fn test_saturated_safe_lanes_reported_not_panicking() {
        let snapshot = RoundSnapshot {
            max_safe_lanes: u32::MAX,
            final_lane: 1,
            payout_lane: 1,
            ..trap_on_lane_six()
        };
        let report = audit_snapshot(&snapshot);
        assert!(!report.valid);
        assert!(report.errors.contains(&AuditError::MaxSafeLanesMismatch {
            recorded: u32::MAX,
            computed: 5,
        }));
        assert!(report.errors.contains(&AuditError::LaneMismatch {
            final_lane: 1,
            outcome: RoundOutcome::Crashed,
        }));
    }
}
