//! Property tests for the deterministic core.

use proptest::prelude::*;

use chicken_crossing::game::evaluator::resolve_crash_cause;
use chicken_crossing::game::resolver::resolve_max_safe_lanes;
use chicken_crossing::game::state::{compute_payout, RoundOutcome};
use chicken_crossing::{Amount, Difficulty, RoundId};

fn difficulty() -> impl Strategy<Value = Difficulty> {
    prop::sample::select(Difficulty::ALL.to_vec())
}

fn round_id() -> impl Strategy<Value = RoundId> {
    any::<[u8; 32]>().prop_map(RoundId::new)
}

proptest! {
    #[test]
    fn resolver_is_deterministic_and_bounded(id in round_id(), d in difficulty()) {
        let first = resolve_max_safe_lanes(&id, d);
        prop_assert_eq!(first, resolve_max_safe_lanes(&id, d));
        prop_assert!(first <= d.max_safe_lanes());
    }

    #[test]
    fn crash_cause_is_stable(id in round_id(), d in difficulty(), lane in 1u32..20) {
        prop_assert_eq!(resolve_crash_cause(&id, lane, d), resolve_crash_cause(&id, lane, d));
    }

    #[test]
    fn ladder_is_monotonic(d in difficulty(), lane in 1u32..19) {
        prop_assume!(lane < d.max_safe_lanes());
        prop_assert!(d.multiplier_at(lane) < d.multiplier_at(lane + 1));
    }

    #[test]
    fn crash_always_pays_zero(
        bet in 1u64..1_000_000,
        d in difficulty(),
        max_safe in 0u32..20,
        lane in 0u32..25,
    ) {
        let (_, payout) = compute_payout(
            Amount::from_thousandths(bet),
            d,
            max_safe.min(d.max_safe_lanes()),
            lane,
            RoundOutcome::Crashed,
        );
        prop_assert_eq!(payout, Amount::ZERO);
    }

    #[test]
    fn payout_lane_never_exceeds_safe_lanes(
        bet in 1u64..1_000_000,
        d in difficulty(),
        max_safe in 0u32..20,
        lane in 0u32..25,
    ) {
        let max_safe = max_safe.min(d.max_safe_lanes());
        let (payout_lane, payout) = compute_payout(
            Amount::from_thousandths(bet),
            d,
            max_safe,
            lane,
            RoundOutcome::CashedOut,
        );
        prop_assert!(payout_lane <= max_safe);
        prop_assert_eq!(payout, Amount::from_thousandths(bet).scale(d.multiplier_at(payout_lane)));
    }

    #[test]
    fn round_id_text_forms_agree(id in round_id()) {
        prop_assert_eq!(id.to_string().parse::<RoundId>().unwrap(), id);
        prop_assert_eq!(format!("0x{}", id.to_hex()).parse::<RoundId>().unwrap(), id);
    }
}

#[test]
fn zero_lane_multiplier_is_zero() {
    for d in Difficulty::ALL {
        assert_eq!(d.multiplier_at(0).hundredths(), 0);
    }
}
