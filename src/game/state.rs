//! Round State Definitions
//!
//! The `Round` aggregate for one play-through and the immutable
//! `RoundSnapshot` emitted when it resolves. Fields are private: the
//! presentation layer reads through accessors, and only the state machine
//! mutates a round.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::hash::{DigestHasher, SnapshotDigest};
use crate::core::money::{Amount, Multiplier};
use crate::core::round_id::RoundId;
use crate::game::collision::CollisionSignal;
use crate::game::ladder::Difficulty;

// =============================================================================
// STATUS / OUTCOME
// =============================================================================

/// Lifecycle status of a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoundStatus {
    /// Bet confirmed, not started.
    Configuring = 0,
    /// Safe lanes fixed, waiting for the start delay.
    Starting = 1,
    /// Accepting jumps and cash-outs.
    Active = 2,
    /// A jump is in flight or a crash is being revealed.
    Jumping = 3,
    /// Terminal. Outcome and payout are immutable.
    Resolved = 4,
}

/// How a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoundOutcome {
    /// Hit by a vehicle or fell into a trap.
    Crashed = 0,
    /// Player took the current multiplier.
    CashedOut = 1,
    /// Crossed every lane.
    Finished = 2,
}

/// Why a crash happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CrashCause {
    /// Struck by a moving vehicle.
    Vehicle = 0,
    /// Fell into a static hazard.
    Trap = 1,
}

/// What decided a crash cause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CrashSource {
    /// Live geometry reported a hit during the jump.
    LiveCollision = 0,
    /// The seeded fallback classifier.
    SeededFallback = 1,
}

/// A crash attributed to a lane. Final once recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributedCrash {
    /// Lane the crash happened on.
    pub lane: u32,
    /// Vehicle or trap.
    pub cause: CrashCause,
    /// Live signal or fallback.
    pub source: CrashSource,
}

/// A jump that has taken off but not landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlight {
    /// Lane being jumped to.
    pub lane: u32,
    /// Collision sample at take-off.
    pub takeoff: CollisionSignal,
}

// =============================================================================
// ROUND
// =============================================================================

/// Mutable aggregate for one play-through.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    id: RoundId,
    difficulty: Difficulty,
    bet: Amount,
    status: RoundStatus,
    max_safe_lanes: u32,
    current_lane: u32,
    in_flight: Option<InFlight>,
    attributed: Option<AttributedCrash>,
    outcome: Option<RoundOutcome>,
    crash: Option<AttributedCrash>,
    payout_lane: u32,
    payout: Option<Amount>,
}

impl Round {
    /// Create a round in `Configuring`.
    pub fn new(id: RoundId, difficulty: Difficulty, bet: Amount) -> Self {
        Self {
            id,
            difficulty,
            bet,
            status: RoundStatus::Configuring,
            max_safe_lanes: 0,
            current_lane: 0,
            in_flight: None,
            attributed: None,
            outcome: None,
            crash: None,
            payout_lane: 0,
            payout: None,
        }
    }

    /// Rebuild the resolved view of a round from its snapshot.
    ///
    /// Copies the stored fields only; the seed is never consulted.
    pub fn from_snapshot(snapshot: &RoundSnapshot) -> Self {
        Self {
            id: snapshot.round_id,
            difficulty: snapshot.difficulty,
            bet: snapshot.bet,
            status: RoundStatus::Resolved,
            max_safe_lanes: snapshot.max_safe_lanes,
            current_lane: snapshot.final_lane,
            in_flight: None,
            attributed: snapshot.crash(),
            outcome: Some(snapshot.outcome),
            crash: snapshot.crash(),
            payout_lane: snapshot.payout_lane,
            payout: Some(snapshot.payout),
        }
    }

    /// Round identifier.
    pub fn id(&self) -> &RoundId {
        &self.id
    }

    /// Difficulty.
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Bet amount.
    pub fn bet(&self) -> Amount {
        self.bet
    }

    /// Lifecycle status.
    pub fn status(&self) -> RoundStatus {
        self.status
    }

    /// Safe lanes fixed at start (0 before start).
    pub fn max_safe_lanes(&self) -> u32 {
        self.max_safe_lanes
    }

    /// Lanes crossed so far. On resolution, the lane the round ended on.
    pub fn current_lane(&self) -> u32 {
        self.current_lane
    }

    /// Jump currently in the air.
    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    /// Crash attributed but not yet committed (or committed).
    pub fn attributed_crash(&self) -> Option<AttributedCrash> {
        self.attributed
    }

    /// Outcome, set only on resolution.
    pub fn outcome(&self) -> Option<RoundOutcome> {
        self.outcome
    }

    /// Crash cause, meaningful only when crashed.
    pub fn crash_cause(&self) -> Option<CrashCause> {
        self.crash.map(|c| c.cause)
    }

    /// Payout, set only on resolution.
    pub fn payout(&self) -> Option<Amount> {
        self.payout
    }

    /// Has the round resolved?
    pub fn is_resolved(&self) -> bool {
        self.status == RoundStatus::Resolved
    }

    /// Multiplier shown for the current lane.
    pub fn current_multiplier(&self) -> Multiplier {
        let lane = self.current_lane.min(self.difficulty.max_safe_lanes());
        self.difficulty.multiplier_at(lane)
    }

    /// Winnings above the stake, if any.
    pub fn profit(&self) -> Option<Amount> {
        self.payout
            .filter(|payout| *payout > self.bet)
            .map(|payout| payout.saturating_sub(self.bet))
    }

    /// Snapshot of a resolved round.
    pub fn snapshot(&self) -> Option<RoundSnapshot> {
        let outcome = self.outcome?;
        let payout = self.payout?;
        Some(RoundSnapshot {
            round_id: self.id,
            bet: self.bet,
            difficulty: self.difficulty,
            max_safe_lanes: self.max_safe_lanes,
            final_lane: self.current_lane,
            payout_lane: self.payout_lane,
            payout,
            outcome,
            crash_cause: self.crash.map(|c| c.cause),
            crash_source: self.crash.map(|c| c.source),
        })
    }

    // =========================================================================
    // Transitions (state machine only)
    // =========================================================================

    pub(crate) fn begin_start(&mut self, max_safe_lanes: u32) {
        self.status = RoundStatus::Starting;
        self.max_safe_lanes = max_safe_lanes;
        self.current_lane = 0;
    }

    pub(crate) fn activate(&mut self) {
        self.status = RoundStatus::Active;
    }

    pub(crate) fn take_off(&mut self, flight: InFlight) {
        self.status = RoundStatus::Jumping;
        self.in_flight = Some(flight);
    }

    pub(crate) fn land_safely(&mut self, lane: u32) {
        self.status = RoundStatus::Active;
        self.in_flight = None;
        self.current_lane = lane;
    }

    /// Record a crash for its lane. The first attribution wins.
    pub(crate) fn attribute_crash(&mut self, crash: AttributedCrash) -> AttributedCrash {
        match self.attributed {
            Some(existing) if existing.lane == crash.lane => existing,
            _ => {
                self.attributed = Some(crash);
                crash
            }
        }
    }

    /// Resolve the round. Returns `None` if it was already resolved.
    pub(crate) fn resolve(
        &mut self,
        outcome: RoundOutcome,
        final_lane: u32,
        crash: Option<AttributedCrash>,
    ) -> Option<RoundSnapshot> {
        if self.is_resolved() {
            return None;
        }

        let (payout_lane, payout) = compute_payout(
            self.bet,
            self.difficulty,
            self.max_safe_lanes,
            final_lane,
            outcome,
        );

        self.status = RoundStatus::Resolved;
        self.in_flight = None;
        self.current_lane = final_lane;
        self.outcome = Some(outcome);
        self.crash = if outcome == RoundOutcome::Crashed { crash } else { None };
        self.payout_lane = payout_lane;
        self.payout = Some(payout);

        self.snapshot()
    }
}

/// Payout for a resolved round: `(payout_lane, payout)`.
///
/// The payout lane is the attempted lane clamped to the round's safe lanes;
/// a crash always pays zero.
pub fn compute_payout(
    bet: Amount,
    difficulty: Difficulty,
    max_safe_lanes: u32,
    attempted_lane: u32,
    outcome: RoundOutcome,
) -> (u32, Amount) {
    let payout_lane = attempted_lane.min(max_safe_lanes);
    if outcome == RoundOutcome::Crashed {
        return (payout_lane, Amount::ZERO);
    }
    let multiplier = difficulty.multiplier_at(payout_lane);
    (payout_lane, bet.scale(multiplier))
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Immutable record of a resolved round. The sole input to replay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Round identifier.
    pub round_id: RoundId,
    /// Stake.
    pub bet: Amount,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Safe lanes fixed at start.
    pub max_safe_lanes: u32,
    /// Lane the round ended on.
    pub final_lane: u32,
    /// Lane the payout was computed at.
    pub payout_lane: u32,
    /// Amount paid (zero on crash).
    pub payout: Amount,
    /// How the round ended.
    pub outcome: RoundOutcome,
    /// Crash cause (crashes only).
    pub crash_cause: Option<CrashCause>,
    /// What decided the crash cause (crashes only).
    pub crash_source: Option<CrashSource>,
}

impl RoundSnapshot {
    /// The attributed crash, if this round crashed.
    pub fn crash(&self) -> Option<AttributedCrash> {
        match (self.outcome, self.crash_cause, self.crash_source) {
            (RoundOutcome::Crashed, Some(cause), Some(source)) => Some(AttributedCrash {
                lane: self.final_lane,
                cause,
                source,
            }),
            _ => None,
        }
    }

    /// Multiplier the payout was computed at (zero on crash).
    pub fn multiplier(&self) -> Multiplier {
        match self.outcome {
            RoundOutcome::Crashed => Multiplier::ZERO,
            _ => self.difficulty.multiplier_at(self.payout_lane),
        }
    }

    /// Is `final_lane` reachable for the recorded outcome?
    ///
    /// Cash-outs end inside the safe lanes, finishes on the finish lane, and
    /// crashes on a ladder lane no further than one past the safe lanes. A
    /// seeded-fallback crash is always exactly that first unsafe lane.
    pub fn lane_consistent(&self) -> bool {
        let ladder_len = self.difficulty.max_safe_lanes();
        let max_safe = self.max_safe_lanes;
        let first_unsafe = max_safe.saturating_add(1);
        let final_lane = self.final_lane;
        match self.outcome {
            RoundOutcome::CashedOut => final_lane >= 1 && final_lane <= max_safe,
            RoundOutcome::Finished => {
                final_lane == self.difficulty.finish_lane() && max_safe == ladder_len
            }
            RoundOutcome::Crashed => {
                let reachable = match self.crash_source {
                    Some(CrashSource::SeededFallback) => final_lane == first_unsafe,
                    _ => final_lane >= 1 && final_lane <= first_unsafe,
                };
                reachable && final_lane <= ladder_len
            }
        }
    }

    /// Check the record is internally consistent before it is replayed.
    ///
    /// A record ending on lane 0 skips the lane check and replays as an
    /// immediate result. Does not consult the seed; see `audit_snapshot`
    /// for that.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let limit = self.difficulty.max_safe_lanes();
        if self.max_safe_lanes > limit {
            return Err(SnapshotError::SafeLanesOutOfRange {
                max_safe_lanes: self.max_safe_lanes,
                limit,
            });
        }

        let finish_lane = self.difficulty.finish_lane();
        if self.final_lane > finish_lane {
            return Err(SnapshotError::FinalLaneOutOfRange {
                final_lane: self.final_lane,
                finish_lane,
            });
        }

        let crashed = self.outcome == RoundOutcome::Crashed;
        if crashed != self.crash_cause.is_some() || crashed != self.crash_source.is_some() {
            return Err(SnapshotError::CrashFieldsMismatch {
                outcome: self.outcome,
            });
        }

        if self.final_lane != 0 && !self.lane_consistent() {
            return Err(SnapshotError::LaneMismatch {
                final_lane: self.final_lane,
                outcome: self.outcome,
            });
        }

        let (payout_lane, payout) = compute_payout(
            self.bet,
            self.difficulty,
            self.max_safe_lanes,
            self.final_lane,
            self.outcome,
        );
        if payout_lane != self.payout_lane || payout != self.payout {
            return Err(SnapshotError::PayoutMismatch);
        }
        Ok(())
    }

    /// Did the player leave with more than the stake?
    pub fn is_win(&self) -> bool {
        self.payout > self.bet
    }

    /// SHA-256 fingerprint over the canonical field order.
    pub fn digest(&self) -> SnapshotDigest {
        let mut hasher = DigestHasher::for_snapshot();
        hasher.update_bytes(self.round_id.as_bytes());
        hasher.update_u64(self.bet.thousandths());
        hasher.update_u8(self.difficulty as u8);
        hasher.update_u32(self.max_safe_lanes);
        hasher.update_u32(self.final_lane);
        hasher.update_u32(self.payout_lane);
        hasher.update_u64(self.payout.thousandths());
        hasher.update_u8(self.outcome as u8);
        hasher.update_bool(self.crash_cause.is_some());
        if let Some(cause) = self.crash_cause {
            hasher.update_u8(cause as u8);
        }
        hasher.update_bool(self.crash_source.is_some());
        if let Some(source) = self.crash_source {
            hasher.update_u8(source as u8);
        }
        hasher.finalize()
    }
}

/// A snapshot that no round could have produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// More safe lanes than the ladder has.
    #[error("{max_safe_lanes} safe lanes exceeds the ladder length {limit}")]
    SafeLanesOutOfRange {
        /// Recorded safe lanes.
        max_safe_lanes: u32,
        /// Ladder length for the difficulty.
        limit: u32,
    },

    /// Final lane past the finish.
    #[error("final lane {final_lane} is past the finish lane {finish_lane}")]
    FinalLaneOutOfRange {
        /// Recorded final lane.
        final_lane: u32,
        /// Finish lane for the difficulty.
        finish_lane: u32,
    },

    /// Crash cause and source must be present exactly when crashed.
    #[error("crash fields do not match outcome {outcome:?}")]
    CrashFieldsMismatch {
        /// Recorded outcome.
        outcome: RoundOutcome,
    },

    /// Final lane unreachable for the outcome.
    #[error("final lane {final_lane} inconsistent with {outcome:?}")]
    LaneMismatch {
        /// Recorded final lane.
        final_lane: u32,
        /// Recorded outcome.
        outcome: RoundOutcome,
    },

    /// Payout or payout lane differs from the payout rule.
    #[error("payout does not match the payout rule")]
    PayoutMismatch,
}
