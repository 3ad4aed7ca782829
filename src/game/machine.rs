//! Round State Machine
//!
//! `RoundSession` sequences the resolver and evaluator over one round at a
//! time and computes payouts. It is synchronous: every action returns the
//! events it produced plus the continuations the caller must hand back to
//! [`RoundSession::resume`] once their delay has elapsed.
//!
//! ## Cancellation
//!
//! Each continuation carries the session epoch it was issued under.
//! Configure, Start, Reset and Rewatch advance the epoch and drop every
//! pending continuation, so a stale timer can never touch a newer round.
//!
//! ## Ordering
//!
//! At most one jump is in flight. Jump and CashOut requests outside the
//! Active state are ignored, not queued.

use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::core::money::Amount;
use crate::core::round_id::RoundId;
use crate::game::collision::{sample_lane, CollisionProbe, FlightSamples};
use crate::game::evaluator::{evaluate_jump, JumpOutcome};
use crate::game::events::{RoundEvent, RoundEventData};
use crate::game::ladder::Difficulty;
use crate::game::replay::replay;
use crate::game::resolver::resolve_max_safe_lanes;
use crate::game::state::{
    AttributedCrash, CrashCause, CrashSource, InFlight, Round, RoundOutcome, RoundSnapshot,
    RoundStatus,
};

/// Work deferred until after a presentation delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
    /// Starting to Active.
    Activate,
    /// Land the in-flight jump and evaluate it.
    Land,
    /// Commit a revealed crash.
    Settle,
    /// Round-end delay elapsed.
    ShowResults,
    /// Jump on the player's behalf.
    AutoJump,
    /// Show one rewatch step.
    ReplayStep {
        /// Lane stepped onto.
        lane: u32,
        /// Show this step as a vehicle strike.
        vehicle_strike: bool,
    },
    /// End the rewatch on the recorded outcome.
    ReplayFinish,
}

/// A scheduled continuation. Hand it back to `resume` after `delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Continuation {
    epoch: u64,
    id: u64,
    delay: Duration,
    action: Deferred,
}

impl Continuation {
    /// Epoch the continuation belongs to.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Unique id within the session.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Delay from the moment it was issued.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The deferred work.
    pub fn action(&self) -> Deferred {
        self.action
    }
}

/// Output of one action or continuation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepResult {
    /// Events in emission order.
    pub events: Vec<RoundEvent>,
    /// Continuations to schedule.
    pub scheduled: Vec<Continuation>,
}

impl StepResult {
    /// Nothing happened.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.scheduled.is_empty()
    }

    /// Append another result.
    pub fn merge(&mut self, other: StepResult) {
        self.events.extend(other.events);
        self.scheduled.extend(other.scheduled);
    }

    /// Snapshot of the settlement in this result, if any.
    pub fn settlement(&self) -> Option<&RoundSnapshot> {
        self.events
            .iter()
            .find(|e| e.is_settlement())
            .and_then(RoundEvent::snapshot)
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Bets must be positive.
    #[error("bet must be positive")]
    BetNotPositive,

    /// Bet under the minimum.
    #[error("bet {bet} is below the minimum of {min}")]
    BetBelowMinimum {
        /// Rejected bet.
        bet: Amount,
        /// Configured minimum.
        min: Amount,
    },

    /// Bet over `min(wallet_balance, max_bet)`.
    #[error("bet {bet} exceeds the allowed maximum of {cap}")]
    BetAboveCap {
        /// Rejected bet.
        bet: Amount,
        /// `min(wallet_balance, max_bet)` at the time.
        cap: Amount,
    },

    /// A round is starting or being played.
    #[error("a round is already in progress")]
    RoundInProgress,

    /// Play-again without an earlier bet.
    #[error("no previous bet to repeat")]
    NoPreviousBet,
}

/// Owns the live round and its pending continuations.
#[derive(Debug)]
pub struct RoundSession {
    config: SessionConfig,
    armed_id: RoundId,
    round: Option<Round>,
    last_bet: Option<(Amount, Difficulty)>,
    last_snapshot: Option<RoundSnapshot>,
    replaying: Option<RoundSnapshot>,
    epoch: u64,
    pending: BTreeSet<u64>,
    next_continuation: u64,
}

impl RoundSession {
    /// Create a session with a freshly drawn round id.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_round_id(config, RoundId::random())
    }

    /// Create a session armed with an externally supplied id.
    pub fn with_round_id(config: SessionConfig, round_id: RoundId) -> Self {
        Self {
            config,
            armed_id: round_id,
            round: None,
            last_bet: None,
            last_snapshot: None,
            replaying: None,
            epoch: 0,
            pending: BTreeSet::new(),
            next_continuation: 0,
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current (or last resolved) round.
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Id the next configured round will use.
    pub fn armed_id(&self) -> RoundId {
        self.armed_id
    }

    /// Most recent settlement.
    pub fn last_snapshot(&self) -> Option<&RoundSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Is a rewatch playing?
    pub fn is_replaying(&self) -> bool {
        self.replaying.is_some()
    }

    /// Current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of continuations still accepted by `resume`.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Is a round starting or being played?
    pub fn round_in_progress(&self) -> bool {
        matches!(
            self.round.as_ref().map(Round::status),
            Some(RoundStatus::Starting | RoundStatus::Active | RoundStatus::Jumping)
        )
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Confirm a bet and create a round in `Configuring`.
    ///
    /// Rejected bets leave the session untouched.
    pub fn configure(&mut self, bet: Amount, difficulty: Difficulty) -> Result<StepResult, ConfigError> {
        if self.round_in_progress() {
            return Err(ConfigError::RoundInProgress);
        }
        if bet.is_zero() {
            return Err(ConfigError::BetNotPositive);
        }
        if bet < self.config.min_bet {
            return Err(ConfigError::BetBelowMinimum {
                bet,
                min: self.config.min_bet,
            });
        }
        let cap = self.config.bet_cap();
        if bet > cap {
            return Err(ConfigError::BetAboveCap { bet, cap });
        }

        // A settled round's id is never played twice.
        let settled_id = self.round.as_ref().filter(|r| r.is_resolved()).map(|r| *r.id());
        if settled_id == Some(self.armed_id) {
            self.armed_id = RoundId::random();
        }

        self.cancel_pending();
        self.replaying = None;
        self.round = Some(Round::new(self.armed_id, difficulty, bet));
        self.last_bet = Some((bet, difficulty));

        info!("Round {} configured: bet {} on {}", self.armed_id, bet, difficulty);

        let mut result = StepResult::default();
        self.emit(&mut result, RoundEventData::Configured { bet, difficulty });
        Ok(result)
    }

    /// Fix the safe lanes and schedule activation.
    pub fn start(&mut self) -> StepResult {
        let mut result = StepResult::default();
        let Some(round) = self.round.as_mut() else {
            debug!("Start ignored: no round configured");
            return result;
        };
        if round.status() != RoundStatus::Configuring {
            debug!("Start ignored in {:?}", round.status());
            return result;
        }

        let max_safe = resolve_max_safe_lanes(round.id(), round.difficulty());
        round.begin_start(max_safe);
        debug!("Round {} resolved {} safe lanes", round.id(), max_safe);

        self.cancel_pending();
        self.replaying = None;
        self.emit(&mut result, RoundEventData::Starting);
        self.schedule(&mut result, self.config.timings.start, Deferred::Activate);
        result
    }

    /// Request a jump to the next lane.
    ///
    /// Samples the probe at take-off; the landing is evaluated when the
    /// scheduled `Land` continuation fires.
    pub fn jump(&mut self, probe: &dyn CollisionProbe) -> StepResult {
        let mut result = StepResult::default();
        let Some(round) = self.round.as_mut() else {
            debug!("Jump ignored: no round");
            return result;
        };
        if round.status() != RoundStatus::Active || round.in_flight().is_some() {
            debug!("Jump ignored in {:?}", round.status());
            return result;
        }

        let lane = round.current_lane() + 1;
        let takeoff = sample_lane(probe, lane, round.difficulty());
        round.take_off(InFlight { lane, takeoff });

        self.emit(
            &mut result,
            RoundEventData::JumpStarted {
                lane,
                vehicle_threat: takeoff.is_hit(),
            },
        );
        self.schedule(&mut result, self.config.timings.flight(), Deferred::Land);
        result
    }

    /// Take the current lane's multiplier.
    pub fn cash_out(&mut self) -> StepResult {
        let Some(round) = self.round.as_ref() else {
            debug!("Cash-out ignored: no round");
            return StepResult::default();
        };
        if round.status() != RoundStatus::Active || round.current_lane() == 0 {
            debug!(
                "Cash-out ignored in {:?} at lane {}",
                round.status(),
                round.current_lane()
            );
            return StepResult::default();
        }

        let lane = round.current_lane();
        let mut result = StepResult::default();
        self.settle(&mut result, RoundOutcome::CashedOut, lane, None);
        result
    }

    /// Discard the round and arm a fresh id.
    pub fn reset(&mut self) -> StepResult {
        self.cancel_pending();
        self.round = None;
        self.replaying = None;
        self.armed_id = RoundId::random();

        info!("Session reset, next round {}", self.armed_id);

        let mut result = StepResult::default();
        self.emit(
            &mut result,
            RoundEventData::RoundReset {
                next_id: self.armed_id,
            },
        );
        result
    }

    /// Reset, then configure and start with the previous bet.
    pub fn play_again(&mut self) -> Result<StepResult, ConfigError> {
        let (bet, difficulty) = self.last_bet.ok_or(ConfigError::NoPreviousBet)?;
        let mut result = self.reset();
        result.merge(self.configure(bet, difficulty)?);
        result.merge(self.start());
        Ok(result)
    }

    /// Rewatch the most recent settlement.
    pub fn rewatch(&mut self) -> StepResult {
        match self.last_snapshot.clone() {
            Some(snapshot) => self.rewatch_snapshot(snapshot),
            None => {
                info!("Rewatch requested with no settled round");
                let mut result = StepResult::default();
                self.emit(
                    &mut result,
                    RoundEventData::Notice {
                        message: "No round to rewatch yet".to_string(),
                    },
                );
                result
            }
        }
    }

    /// Rewatch a stored snapshot, e.g. one decoded from a share token.
    ///
    /// Never consults the resolver or the live probe. A record no round
    /// could have produced is refused with a notice and changes nothing.
    pub fn rewatch_snapshot(&mut self, snapshot: RoundSnapshot) -> StepResult {
        if self.round_in_progress() {
            debug!("Rewatch ignored: round in progress");
            return StepResult::default();
        }
        if let Err(e) = snapshot.validate() {
            warn!("Refusing to rewatch round {}: {}", snapshot.round_id, e);
            let mut result = StepResult::default();
            self.emit(
                &mut result,
                RoundEventData::Notice {
                    message: format!("This round cannot be rewatched: {e}"),
                },
            );
            return result;
        }

        self.cancel_pending();
        let plan = replay(&snapshot, &self.config.timings);
        info!(
            "Rewatching round {} ({} lanes)",
            snapshot.round_id, snapshot.final_lane
        );

        let mut result = StepResult::default();
        self.emit_for(
            &mut result,
            snapshot.round_id,
            RoundEventData::ReplayStarted {
                final_lane: snapshot.final_lane,
            },
        );

        if plan.is_immediate() {
            self.finish_replay(&mut result, snapshot);
            return result;
        }

        self.replaying = Some(snapshot);
        for step in &plan.steps {
            self.schedule(
                &mut result,
                step.at,
                Deferred::ReplayStep {
                    lane: step.lane,
                    vehicle_strike: step.vehicle_strike,
                },
            );
        }
        self.schedule(&mut result, plan.finish_at, Deferred::ReplayFinish);
        result
    }

    /// Run a continuation whose delay has elapsed.
    ///
    /// Stale continuations (older epoch, or already cancelled) are ignored.
    pub fn resume(&mut self, continuation: Continuation, probe: &dyn CollisionProbe) -> StepResult {
        if continuation.epoch != self.epoch || !self.pending.remove(&continuation.id) {
            debug!(
                "Stale continuation {} ({:?}) ignored",
                continuation.id, continuation.action
            );
            return StepResult::default();
        }

        match continuation.action {
            Deferred::Activate => self.on_activate(),
            Deferred::Land => self.on_land(probe),
            Deferred::Settle => self.on_settle(),
            Deferred::ShowResults => {
                let mut result = StepResult::default();
                self.emit(&mut result, RoundEventData::ResultsReady);
                result
            }
            Deferred::AutoJump => self.jump(probe),
            Deferred::ReplayStep {
                lane,
                vehicle_strike,
            } => {
                let mut result = StepResult::default();
                if let Some(snapshot) = &self.replaying {
                    let round_id = snapshot.round_id;
                    self.emit_for(
                        &mut result,
                        round_id,
                        RoundEventData::ReplayStep {
                            lane,
                            vehicle_strike,
                        },
                    );
                }
                result
            }
            Deferred::ReplayFinish => {
                let mut result = StepResult::default();
                if let Some(snapshot) = self.replaying.take() {
                    self.finish_replay(&mut result, snapshot);
                }
                result
            }
        }
    }

    // =========================================================================
    // Continuation handlers
    // =========================================================================

    fn on_activate(&mut self) -> StepResult {
        let mut result = StepResult::default();
        let Some(round) = self.round.as_mut() else {
            return result;
        };
        if round.status() != RoundStatus::Starting {
            return result;
        }

        round.activate();
        let max_safe_lanes = round.max_safe_lanes();
        info!("Round {} started", round.id());

        self.emit(&mut result, RoundEventData::Started { max_safe_lanes });
        self.schedule_auto_jump(&mut result);
        result
    }

    fn on_land(&mut self, probe: &dyn CollisionProbe) -> StepResult {
        let mut result = StepResult::default();
        let Some(round) = self.round.as_mut() else {
            return result;
        };
        let Some(flight) = round.in_flight() else {
            return result;
        };

        let samples = FlightSamples {
            takeoff: flight.takeoff,
            landing: sample_lane(probe, flight.lane, round.difficulty()),
        };

        match evaluate_jump(round, samples) {
            JumpOutcome::Advance { lane } => {
                round.land_safely(lane);
                let multiplier = round.current_multiplier();
                debug!("Round {} advanced to lane {} ({})", round.id(), lane, multiplier);
                self.emit(&mut result, RoundEventData::LaneAdvanced { lane, multiplier });
                self.schedule_auto_jump(&mut result);
            }
            JumpOutcome::Crash(crash) => {
                let crash = round.attribute_crash(crash);
                debug!(
                    "Round {} crashed on lane {}: {:?} ({:?})",
                    round.id(),
                    crash.lane,
                    crash.cause,
                    crash.source
                );
                self.emit(
                    &mut result,
                    RoundEventData::CrashPending {
                        lane: crash.lane,
                        cause: crash.cause,
                        source: crash.source,
                    },
                );
                match crash.source {
                    CrashSource::LiveCollision => {
                        self.settle(&mut result, RoundOutcome::Crashed, crash.lane, Some(crash));
                    }
                    CrashSource::SeededFallback => {
                        let delay = self.reveal_delay(crash);
                        self.schedule(&mut result, delay, Deferred::Settle);
                    }
                }
            }
            JumpOutcome::Finish { final_lane, .. } => {
                self.settle(&mut result, RoundOutcome::Finished, final_lane, None);
            }
        }
        result
    }

    fn on_settle(&mut self) -> StepResult {
        let mut result = StepResult::default();
        let Some(round) = self.round.as_ref() else {
            return result;
        };
        if round.status() != RoundStatus::Jumping {
            return result;
        }
        if let Some(crash) = round.attributed_crash() {
            self.settle(&mut result, RoundOutcome::Crashed, crash.lane, Some(crash));
        }
        result
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn settle(
        &mut self,
        result: &mut StepResult,
        outcome: RoundOutcome,
        final_lane: u32,
        crash: Option<AttributedCrash>,
    ) {
        let Some(round) = self.round.as_mut() else {
            return;
        };
        let Some(snapshot) = round.resolve(outcome, final_lane, crash) else {
            return;
        };

        info!(
            "Round {} settled: {:?} on lane {}, payout {}",
            snapshot.round_id, snapshot.outcome, snapshot.final_lane, snapshot.payout
        );

        self.last_snapshot = Some(snapshot.clone());
        self.emit(result, RoundEventData::RoundSettled { snapshot });
        self.schedule(result, self.config.timings.round_end, Deferred::ShowResults);
    }

    fn finish_replay(&mut self, result: &mut StepResult, snapshot: RoundSnapshot) {
        // The round view comes from the record, never from the seed. A
        // configured bet outlives the rewatch.
        if self.round.as_ref().map_or(true, Round::is_resolved) {
            self.round = Some(Round::from_snapshot(&snapshot));
        }
        let round_id = snapshot.round_id;
        self.emit_for(result, round_id, RoundEventData::ReplayFinished { snapshot });
    }

    fn reveal_delay(&self, crash: AttributedCrash) -> Duration {
        match crash.cause {
            CrashCause::Trap => self.config.timings.trap_reveal,
            CrashCause::Vehicle => self.config.timings.vehicle_strike_reveal,
        }
    }

    fn schedule_auto_jump(&mut self, result: &mut StepResult) {
        if self.config.auto_jump {
            self.schedule(result, self.config.timings.auto_jump, Deferred::AutoJump);
        }
    }

    fn cancel_pending(&mut self) {
        self.epoch += 1;
        self.pending.clear();
    }

    fn schedule(&mut self, result: &mut StepResult, delay: Duration, action: Deferred) {
        let id = self.next_continuation;
        self.next_continuation += 1;
        self.pending.insert(id);
        result.scheduled.push(Continuation {
            epoch: self.epoch,
            id,
            delay,
            action,
        });
    }

    fn emit(&self, result: &mut StepResult, data: RoundEventData) {
        let round_id = self.round.as_ref().map(|r| *r.id()).unwrap_or(self.armed_id);
        self.emit_for(result, round_id, data);
    }

    fn emit_for(&self, result: &mut StepResult, round_id: RoundId, data: RoundEventData) {
        result.events.push(RoundEvent::new(self.epoch, round_id, data));
    }
}
