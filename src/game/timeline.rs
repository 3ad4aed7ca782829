//! Deterministic Continuation Scheduler
//!
//! Virtual-clock driver for a `RoundSession`. Continuations are queued by
//! due time and fired in (due time, id) order, so the same action sequence
//! always yields the same event sequence. Used by tests and simulations;
//! the tokio driver in `session::driver` is the wall-clock counterpart.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::game::collision::CollisionProbe;
use crate::game::events::RoundEvent;
use crate::game::machine::{Continuation, RoundSession, StepResult};

/// Virtual clock plus pending continuations.
#[derive(Debug, Default)]
pub struct Timeline {
    now: Duration,
    queue: BTreeMap<(Duration, u64), Continuation>,
}

impl Timeline {
    /// Empty timeline at t = 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of queued continuations (including stale ones).
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Is anything queued?
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue a result's continuations relative to now and return its events.
    pub fn apply(&mut self, result: StepResult) -> Vec<RoundEvent> {
        let now = self.now;
        self.enqueue(now, result.scheduled);
        result.events
    }

    /// Advance the clock by `dt`, firing everything that falls due.
    ///
    /// Continuations scheduled by fired ones are timed from their parent's
    /// due time and fire in the same call if they fall inside the window.
    pub fn advance(
        &mut self,
        dt: Duration,
        session: &mut RoundSession,
        probe: &dyn CollisionProbe,
    ) -> Vec<RoundEvent> {
        let deadline = self.now + dt;
        let mut events = Vec::new();

        while let Some((&(due, id), _)) = self.queue.first_key_value() {
            if due > deadline {
                break;
            }
            let Some(continuation) = self.queue.remove(&(due, id)) else {
                break;
            };
            self.now = due;
            let result = session.resume(continuation, probe);
            events.extend(result.events);
            self.enqueue(due, result.scheduled);
        }

        self.now = deadline;
        events
    }

    /// Fire everything until nothing is queued.
    pub fn run_until_idle(
        &mut self,
        session: &mut RoundSession,
        probe: &dyn CollisionProbe,
    ) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        while let Some((&(due, _), _)) = self.queue.first_key_value() {
            let dt = due.saturating_sub(self.now);
            events.extend(self.advance(dt, session, probe));
        }
        events
    }

    /// Drop every queued continuation.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    fn enqueue(&mut self, base: Duration, scheduled: Vec<Continuation>) {
        for continuation in scheduled {
            let due = base + continuation.delay();
            self.queue.insert((due, continuation.id()), continuation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::core::money::Amount;
    use crate::core::round_id::RoundId;
    use crate::game::collision::NoProbe;
    use crate::game::events::RoundEventData;
    use crate::game::ladder::Difficulty;
    use crate::game::state::{RoundOutcome, RoundStatus};

    fn session(id: u64) -> RoundSession {
        RoundSession::with_round_id(SessionConfig::default(), RoundId::from_u64(id))
    }

    #[test]
    fn test_activation_waits_for_start_delay() {
        let mut s = session(1);
        let mut timeline = Timeline::new();
        timeline.apply(s.configure(Amount::from_units(5), Difficulty::Easy).unwrap());
        timeline.apply(s.start());

        assert!(timeline.advance(Duration::from_millis(449), &mut s, &NoProbe).is_empty());
        assert_eq!(s.round().unwrap().status(), RoundStatus::Starting);

        let events = timeline.advance(Duration::from_millis(1), &mut s, &NoProbe);
        assert_eq!(events.len(), 1);
        assert_eq!(s.round().unwrap().status(), RoundStatus::Active);
        assert_eq!(timeline.now(), Duration::from_millis(450));
    }

    #[test]
    fn test_run_until_idle_settles_crash() {
        // id 1 on Medium: five safe lanes, then a trap on lane 6.
        let mut s = session(1);
        let mut timeline = Timeline::new();
        timeline.apply(s.configure(Amount::from_units(10), Difficulty::Medium).unwrap());
        timeline.apply(s.start());
        timeline.run_until_idle(&mut s, &NoProbe);

        for _ in 0..6 {
            timeline.apply(s.jump(&NoProbe));
            timeline.run_until_idle(&mut s, &NoProbe);
        }
        let round = s.round().unwrap();
        assert_eq!(round.outcome(), Some(RoundOutcome::Crashed));
        assert_eq!(round.current_lane(), 6);
        assert!(timeline.is_idle());
    }

    #[test]
    fn test_stale_continuations_drain_silently() {
        let mut s = session(1);
        let mut timeline = Timeline::new();
        timeline.apply(s.configure(Amount::from_units(5), Difficulty::Easy).unwrap());
        timeline.apply(s.start());
        timeline.run_until_idle(&mut s, &NoProbe);

        timeline.apply(s.jump(&NoProbe));
        timeline.apply(s.reset());
        assert_eq!(timeline.queued(), 1);

        let events = timeline.run_until_idle(&mut s, &NoProbe);
        assert!(events.is_empty());
        assert!(s.round().is_none());
    }

    #[test]
    fn test_replay_steps_fire_in_order() {
        let mut s = session(0);
        let mut timeline = Timeline::new();
        timeline.apply(s.configure(Amount::from_units(10), Difficulty::Medium).unwrap());
        timeline.apply(s.start());
        timeline.run_until_idle(&mut s, &NoProbe);
        for _ in 0..2 {
            timeline.apply(s.jump(&NoProbe));
            timeline.run_until_idle(&mut s, &NoProbe);
        }
        timeline.apply(s.cash_out());
        timeline.run_until_idle(&mut s, &NoProbe);

        timeline.apply(s.rewatch());
        let events = timeline.run_until_idle(&mut s, &NoProbe);
        let lanes: Vec<u32> = events
            .iter()
            .filter_map(|e| match e.data {
                RoundEventData::ReplayStep { lane, .. } => Some(lane),
                _ => None,
            })
            .collect();
        assert_eq!(lanes, vec![1, 2]);
        assert!(matches!(
            events.last().map(|e| &e.data),
            Some(RoundEventData::ReplayFinished { .. })
        ));
    }
}
