//! End-to-end round scenarios driven through the virtual-clock timeline.

use chicken_crossing::game::collision::{CollisionSignal, NoProbe, ScriptedProbe};
use chicken_crossing::game::evaluator::resolve_crash_cause;
use chicken_crossing::game::events::{RoundEvent, RoundEventData};
use chicken_crossing::game::state::{CrashCause, CrashSource, RoundStatus};
use chicken_crossing::game::timeline::Timeline;
use chicken_crossing::game::CollisionProbe;
use chicken_crossing::session::{decode_share_token, encode_share_token};
use chicken_crossing::{
    Amount, Difficulty, Multiplier, RoundId, RoundOutcome, RoundSession, SessionConfig,
};

struct Table {
    session: RoundSession,
    timeline: Timeline,
}

impl Table {
    fn new(id: u64) -> Self {
        Self {
            session: RoundSession::with_round_id(SessionConfig::default(), RoundId::from_u64(id)),
            timeline: Timeline::new(),
        }
    }

    fn open(id: u64, bet: u64, difficulty: Difficulty) -> Self {
        let mut table = Self::new(id);
        let configured = table
            .session
            .configure(Amount::from_units(bet), difficulty)
            .unwrap();
        table.timeline.apply(configured);
        table.timeline.apply(table.session.start());
        table.settle_timers(&NoProbe);
        table
    }

    fn jump(&mut self, probe: &dyn CollisionProbe) -> Vec<RoundEvent> {
        let mut events = self.timeline.apply(self.session.jump(probe));
        events.extend(self.settle_timers(probe));
        events
    }

    fn settle_timers(&mut self, probe: &dyn CollisionProbe) -> Vec<RoundEvent> {
        self.timeline.run_until_idle(&mut self.session, probe)
    }
}

#[test]
fn test_scenario_four_safe_jumps() {
    // id 1 on Easy resolves 4 safe lanes.
    let mut table = Table::open(1, 5, Difficulty::Easy);
    let round = table.session.round().unwrap();
    assert_eq!(round.status(), RoundStatus::Active);
    assert!(round.max_safe_lanes() <= Difficulty::Easy.max_safe_lanes());
    assert_eq!(round.max_safe_lanes(), 4);

    for _ in 0..4 {
        table.jump(&NoProbe);
    }

    let round = table.session.round().unwrap();
    assert_eq!(round.status(), RoundStatus::Active);
    assert_eq!(round.current_lane(), 4);
    assert_eq!(round.current_multiplier(), Multiplier::from_hundredths(123));
}

#[test]
fn test_scenario_first_unsafe_lane_uses_fallback() {
    // id 1 on Medium resolves 5 safe lanes.
    let mut table = Table::open(1, 10, Difficulty::Medium);
    for _ in 0..5 {
        table.jump(&NoProbe);
    }
    let events = table.jump(&NoProbe);

    let round = table.session.round().unwrap();
    assert_eq!(round.outcome(), Some(RoundOutcome::Crashed));
    assert_eq!(round.current_lane(), 6);
    assert_eq!(round.payout(), Some(Amount::ZERO));

    let expected = resolve_crash_cause(&RoundId::from_u64(1), 6, Difficulty::Medium);
    assert_eq!(expected, CrashCause::Trap);
    assert_eq!(round.crash_cause(), Some(expected));

    let pending: Vec<_> = events
        .iter()
        .filter(|e| matches!(e.data, RoundEventData::CrashPending { .. }))
        .collect();
    assert_eq!(pending.len(), 1);
}

#[test]
fn test_scenario_cash_out_then_rewatch() {
    // id 0 on Medium resolves 8 safe lanes.
    let mut table = Table::open(0, 10, Difficulty::Medium);
    for _ in 0..3 {
        table.jump(&NoProbe);
    }
    let settled = table.timeline.apply(table.session.cash_out());
    let snapshot = settled
        .iter()
        .find_map(|e| match &e.data {
            RoundEventData::RoundSettled { snapshot } => Some(snapshot.clone()),
            _ => None,
        })
        .unwrap();
    table.settle_timers(&NoProbe);

    assert_eq!(snapshot.outcome, RoundOutcome::CashedOut);
    assert_eq!(snapshot.final_lane, 3);
    assert_eq!(snapshot.payout, Amount::from_thousandths(16_400));
    assert_eq!(snapshot.crash_cause, None);

    // Rewatch from a decoded share token, as a shared link would.
    let token = encode_share_token(&snapshot).unwrap();
    let decoded = decode_share_token(&token).unwrap();
    let mut events = table.timeline.apply(table.session.rewatch_snapshot(decoded));
    events.extend(table.settle_timers(&NoProbe));

    let lanes: Vec<u32> = events
        .iter()
        .filter_map(|e| match e.data {
            RoundEventData::ReplayStep { lane, .. } => Some(lane),
            _ => None,
        })
        .collect();
    assert_eq!(lanes, vec![1, 2, 3]);

    let replayed = events.last().and_then(RoundEvent::snapshot).unwrap();
    assert_eq!(replayed, &snapshot);
    assert_eq!(replayed.digest(), snapshot.digest());

    let view = table.session.round().unwrap();
    assert_eq!(view.outcome(), Some(RoundOutcome::CashedOut));
    assert_eq!(view.current_lane(), 3);
    assert_eq!(view.payout(), Some(snapshot.payout));
}

#[test]
fn test_double_jump_advances_once() {
    let mut table = Table::open(0, 10, Difficulty::Medium);
    let first = table.session.jump(&NoProbe);
    let second = table.session.jump(&NoProbe);
    assert!(second.is_empty());

    table.timeline.apply(first);
    table.timeline.apply(second);
    table.settle_timers(&NoProbe);
    assert_eq!(table.session.round().unwrap().current_lane(), 1);
}

#[test]
fn test_reset_during_crash_reveal() {
    // The pending trap settlement must not touch the next round.
    let mut table = Table::open(1, 10, Difficulty::Medium);
    for _ in 0..5 {
        table.jump(&NoProbe);
    }
    table.timeline.apply(table.session.jump(&NoProbe));
    // Fire the landing only; the settle continuation stays queued.
    table.timeline.advance(
        SessionConfig::default().timings.flight(),
        &mut table.session,
        &NoProbe,
    );
    assert_eq!(table.session.round().unwrap().status(), RoundStatus::Jumping);

    table.timeline.apply(table.session.reset());
    let configured = table
        .session
        .configure(Amount::from_units(10), Difficulty::Medium)
        .unwrap();
    table.timeline.apply(configured);

    let late = table.settle_timers(&NoProbe);
    assert!(late.is_empty());
    let round = table.session.round().unwrap();
    assert_eq!(round.status(), RoundStatus::Configuring);
    assert_eq!(round.outcome(), None);
    assert!(table.session.last_snapshot().is_none());
}

#[test]
fn test_full_crossing_pays_top_multiplier() {
    // id 773 on Medium crosses every lane.
    let mut table = Table::open(773, 1, Difficulty::Medium);
    for _ in 0..=Difficulty::Medium.max_safe_lanes() {
        table.jump(&NoProbe);
    }
    let snapshot = table.session.last_snapshot().unwrap();
    assert_eq!(snapshot.outcome, RoundOutcome::Finished);
    assert_eq!(snapshot.final_lane, Difficulty::Medium.finish_lane());
    assert_eq!(snapshot.payout_lane, Difficulty::Medium.max_safe_lanes());
    assert_eq!(snapshot.payout, Amount::from_thousandths(1_117_200));
}

#[test]
fn test_live_hit_overrides_safe_lane() {
    let mut table = Table::open(0, 10, Difficulty::Medium);
    let probe = ScriptedProbe::new().with(2, CollisionSignal::Hit);
    table.jump(&probe);
    table.jump(&probe);

    let snapshot = table.session.last_snapshot().unwrap();
    assert_eq!(snapshot.outcome, RoundOutcome::Crashed);
    assert_eq!(snapshot.final_lane, 2);
    assert_eq!(snapshot.crash_cause, Some(CrashCause::Vehicle));
    assert_eq!(snapshot.crash_source, Some(CrashSource::LiveCollision));

    // The rewatch shows the strike even though the lane was safe.
    let events = {
        let mut events = table.timeline.apply(table.session.rewatch());
        events.extend(table.settle_timers(&NoProbe));
        events
    };
    assert!(events.iter().any(|e| matches!(
        e.data,
        RoundEventData::ReplayStep {
            lane: 2,
            vehicle_strike: true
        }
    )));
}

#[test]
fn test_crafted_share_token_is_refused() {
    // id 0 on Medium resolves 8 safe lanes.
    let mut table = Table::open(0, 10, Difficulty::Medium);
    for _ in 0..3 {
        table.jump(&NoProbe);
    }
    table.timeline.apply(table.session.cash_out());
    table.settle_timers(&NoProbe);
    let mut crafted = table.session.last_snapshot().unwrap().clone();
    crafted.difficulty = Difficulty::Expert;
    crafted.max_safe_lanes = 10;
    crafted.final_lane = 5_000_000;

    let token = encode_share_token(&crafted).unwrap();
    let decoded = decode_share_token(&token).unwrap();
    assert!(decoded.validate().is_err());

    let events = table.timeline.apply(table.session.rewatch_snapshot(decoded));
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].data, RoundEventData::Notice { .. }));
    assert!(table.timeline.is_idle());
    assert!(!table.session.is_replaying());
    assert_eq!(table.session.pending_count(), 0);

    let view = table.session.round().unwrap();
    assert_eq!(view.outcome(), Some(RoundOutcome::CashedOut));
    assert_eq!(view.current_lane(), 3);
}
