//! Difficulty Ladder Table
//!
//! Static multiplier ladders, one per difficulty, plus the accessors the
//! resolver, evaluator and state machine consult. Index 0 of a ladder is
//! lane 1's multiplier.
//!
//! Survival odds follow the crash-game invariant: multiplier × cumulative
//! survival ≈ constant. The house edge (0.99) applies at the first step
//! only; every later step survives with `ladder[step-2] / ladder[step-1]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::money::Multiplier;

/// House edge numerator (0.99 = 99 / 100).
pub const HOUSE_EDGE_NUMERATOR: u64 = 99;

/// House edge denominator.
pub const HOUSE_EDGE_DENOMINATOR: u64 = 100;

const fn m(hundredths: u32) -> Multiplier {
    Multiplier::from_hundredths(hundredths)
}

const EASY_LADDER: [Multiplier; 19] = [
    m(103), m(109), m(115), m(123), m(131), m(140), m(151), m(163), m(178), m(196),
    m(218), m(245), m(280), m(327), m(392), m(490), m(653), m(980), m(1960),
];

const MEDIUM_LADDER: [Multiplier; 17] = [
    m(115), m(137), m(164), m(200), m(246), m(307), m(391), m(508), m(677), m(931),
    m(1330), m(1995), m(3192), m(5586), m(11172), m(27930), m(111720),
];

const HARD_LADDER: [Multiplier; 15] = [
    m(131), m(177), m(246), m(348), m(506), m(759), m(1181), m(1918), m(3289), m(6029),
    m(12059), m(27132), m(72352), m(253232), m(1519392),
];

const EXPERT_LADDER: [Multiplier; 10] = [
    m(196), m(414), m(931), m(2261), m(6029), m(18088), m(63308), m(274335), m(1646008),
    m(18106088),
];

/// Round difficulty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Difficulty {
    /// 19 lanes, gentle ladder
    Easy = 0,
    /// 17 lanes
    #[default]
    Medium = 1,
    /// 15 lanes
    Hard = 2,
    /// 10 lanes, steep ladder
    Expert = 3,
}

impl Difficulty {
    /// Every difficulty, in ladder order.
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];

    /// Name used in seed strings. Changing it changes every outcome.
    pub const fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }

    /// The multiplier ladder.
    pub fn ladder(self) -> &'static [Multiplier] {
        match self {
            Difficulty::Easy => &EASY_LADDER,
            Difficulty::Medium => &MEDIUM_LADDER,
            Difficulty::Hard => &HARD_LADDER,
            Difficulty::Expert => &EXPERT_LADDER,
        }
    }

    /// Maximum number of safe lanes (ladder length).
    #[inline]
    pub fn max_safe_lanes(self) -> u32 {
        self.ladder().len() as u32
    }

    /// Lane reached by crossing every safe lane.
    #[inline]
    pub fn finish_lane(self) -> u32 {
        self.max_safe_lanes() + 1
    }

    /// Multiplier after passing `lanes_passed` lanes.
    ///
    /// Zero lanes means nothing at stake yet. Lanes past the ladder clamp to
    /// its last (maximum) value.
    pub fn multiplier_at(self, lanes_passed: u32) -> Multiplier {
        if lanes_passed == 0 {
            return Multiplier::ZERO;
        }
        let ladder = self.ladder();
        let step = (lanes_passed as usize).clamp(1, ladder.len());
        ladder[step - 1]
    }

    /// Exact odds of surviving `step` (1-based). Zero outside the ladder.
    pub fn survival_odds(self, step: u32) -> SurvivalOdds {
        let ladder = self.ladder();
        if step < 1 || step as usize > ladder.len() {
            return SurvivalOdds::NEVER;
        }

        if step == 1 {
            // 0.99 / (L0 / 100) == 99 / L0
            let first = ladder[0].hundredths() as u64;
            return SurvivalOdds::new(
                HOUSE_EDGE_NUMERATOR * 100 / HOUSE_EDGE_DENOMINATOR,
                first,
            );
        }

        let prev = ladder[step as usize - 2].hundredths() as u64;
        let current = ladder[step as usize - 1].hundredths() as u64;
        SurvivalOdds::new(prev, current)
    }

    /// Survival probability of `step` as a float, for display.
    pub fn survival_probability(self, step: u32) -> f64 {
        self.survival_odds(step).as_f64()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown difficulty: {s}"))
    }
}

/// An exact probability `num / den`, clamped to [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivalOdds {
    num: u64,
    den: u64,
}

impl SurvivalOdds {
    /// Probability 0.
    pub const NEVER: SurvivalOdds = SurvivalOdds { num: 0, den: 1 };

    /// Probability 1.
    pub const CERTAIN: SurvivalOdds = SurvivalOdds { num: 1, den: 1 };

    /// Create and clamp to [0, 1]. A zero denominator means never.
    pub fn new(num: u64, den: u64) -> Self {
        if den == 0 {
            Self::NEVER
        } else if num >= den {
            Self::CERTAIN
        } else {
            Self { num, den }
        }
    }

    /// Numerator.
    pub fn numerator(self) -> u64 {
        self.num
    }

    /// Denominator.
    pub fn denominator(self) -> u64 {
        self.den
    }

    /// Does a 32-bit uniform draw survive these odds?
    ///
    /// The draw `u` stands for `u / 2^32`; the step fails when that exceeds
    /// `num / den`. Compared exactly in u128.
    #[inline]
    pub fn admits(self, draw: u32) -> bool {
        (draw as u128) * (self.den as u128) <= (self.num as u128) << 32
    }

    /// Lossy conversion for display.
    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }
}
