//! Round Events
//!
//! Events emitted by the state machine. The presentation layer animates
//! off these instead of polling shared flags.

use serde::{Deserialize, Serialize};

use crate::core::money::{Amount, Multiplier};
use crate::core::round_id::RoundId;
use crate::game::ladder::Difficulty;
use crate::game::state::{CrashCause, CrashSource, RoundSnapshot};

/// Round event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEventData {
    /// Bet accepted, round created
    Configured {
        /// Stake.
        bet: Amount,
        /// Chosen difficulty.
        difficulty: Difficulty,
    },

    /// Safe lanes fixed, start delay running
    Starting,

    /// Round accepts jumps
    Started {
        /// Safe lanes fixed for this round.
        max_safe_lanes: u32,
    },

    /// Player left the curb for `lane`
    JumpStarted {
        /// Target lane.
        lane: u32,
        /// A vehicle overlapped the target lane at take-off.
        vehicle_threat: bool,
    },

    /// Landed safely on `lane`
    LaneAdvanced {
        /// Lane landed on.
        lane: u32,
        /// Multiplier now on offer.
        multiplier: Multiplier,
    },

    /// Crash decided, reveal running before settlement
    CrashPending {
        /// Crash lane.
        lane: u32,
        /// Vehicle or trap.
        cause: CrashCause,
        /// Live signal or fallback.
        source: CrashSource,
    },

    /// Round resolved
    RoundSettled {
        /// Settlement record.
        snapshot: RoundSnapshot,
    },

    /// Round-end delay elapsed; results can be shown
    ResultsReady,

    /// Round discarded, fresh identifier armed
    RoundReset {
        /// Id the next round will use.
        next_id: RoundId,
    },

    /// Rewatch began
    ReplayStarted {
        /// Lane the rewatch ends on.
        final_lane: u32,
    },

    /// Rewatch stepped onto `lane`
    ReplayStep {
        /// Lane stepped onto.
        lane: u32,
        /// Show this step as a vehicle strike.
        vehicle_strike: bool,
    },

    /// Rewatch ended on the recorded outcome
    ReplayFinished {
        /// The record that was replayed.
        snapshot: RoundSnapshot,
    },

    /// Informational message for the player
    Notice {
        /// Text to show.
        message: String,
    },
}

/// An event tagged with the round and session epoch it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEvent {
    /// Session epoch when emitted
    pub epoch: u64,

    /// Round the event concerns
    pub round_id: RoundId,

    /// Event data
    pub data: RoundEventData,
}

impl RoundEvent {
    /// Create a new event.
    pub fn new(epoch: u64, round_id: RoundId, data: RoundEventData) -> Self {
        Self {
            epoch,
            round_id,
            data,
        }
    }

    /// Snapshot carried by settlement and replay-finished events.
    pub fn snapshot(&self) -> Option<&RoundSnapshot> {
        match &self.data {
            RoundEventData::RoundSettled { snapshot }
            | RoundEventData::ReplayFinished { snapshot } => Some(snapshot),
            _ => None,
        }
    }

    /// Is this a terminal event for a live round?
    pub fn is_settlement(&self) -> bool {
        matches!(self.data, RoundEventData::RoundSettled { .. })
    }
}
