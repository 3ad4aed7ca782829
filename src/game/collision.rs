//! Live Collision Signal
//!
//! The presentation layer owns real-time geometry (moving vehicles vs. the
//! player sprite). The engine only asks, per lane, whether they overlap
//! right now. The answer may be indeterminate, e.g. before layout has
//! been measured; that is "no live information", never a fault.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::game::ladder::Difficulty;

/// One sample of the live collision signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionSignal {
    /// A vehicle visibly overlaps the player.
    Hit,
    /// Measured, no overlap.
    Clear,
    /// No measurement available.
    #[default]
    Indeterminate,
}

impl CollisionSignal {
    /// Is this a confirmed hit?
    #[inline]
    pub fn is_hit(self) -> bool {
        matches!(self, CollisionSignal::Hit)
    }
}

impl From<Option<bool>> for CollisionSignal {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => CollisionSignal::Hit,
            Some(false) => CollisionSignal::Clear,
            None => CollisionSignal::Indeterminate,
        }
    }
}

/// Capability supplied by the presentation layer.
///
/// Queried synchronously at take-off and at landing of each jump.
pub trait CollisionProbe {
    /// Sample the signal for `lane`.
    fn sample(&self, lane: u32) -> CollisionSignal;
}

impl<F> CollisionProbe for F
where
    F: Fn(u32) -> CollisionSignal,
{
    fn sample(&self, lane: u32) -> CollisionSignal {
        self(lane)
    }
}

/// Probe for headless play: always indeterminate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProbe;

impl CollisionProbe for NoProbe {
    fn sample(&self, _lane: u32) -> CollisionSignal {
        CollisionSignal::Indeterminate
    }
}

/// Fixed per-lane answers. Unlisted lanes are indeterminate.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProbe {
    lanes: BTreeMap<u32, CollisionSignal>,
}

impl ScriptedProbe {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `signal` for `lane`.
    pub fn with(mut self, lane: u32, signal: CollisionSignal) -> Self {
        self.lanes.insert(lane, signal);
        self
    }
}

impl CollisionProbe for ScriptedProbe {
    fn sample(&self, lane: u32) -> CollisionSignal {
        self.lanes.get(&lane).copied().unwrap_or_default()
    }
}

/// Is `lane` a traffic lane (between the curb and the finish)?
#[inline]
pub fn is_traffic_lane(lane: u32, difficulty: Difficulty) -> bool {
    lane > 0 && lane < difficulty.finish_lane()
}

/// Sample the probe for a lane, ignoring it off the road.
pub fn sample_lane(probe: &dyn CollisionProbe, lane: u32, difficulty: Difficulty) -> CollisionSignal {
    if is_traffic_lane(lane, difficulty) {
        probe.sample(lane)
    } else {
        CollisionSignal::Indeterminate
    }
}

/// Both samples taken during one jump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightSamples {
    /// Sampled when the jump was requested.
    pub takeoff: CollisionSignal,
    /// Sampled after the flight, at landing.
    pub landing: CollisionSignal,
}

impl FlightSamples {
    /// Did a vehicle touch the player at any point in the flight?
    #[inline]
    pub fn touched(&self) -> bool {
        self.takeoff.is_hit() || self.landing.is_hit()
    }
}
