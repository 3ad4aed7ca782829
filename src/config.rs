//! Session Configuration
//!
//! Bet bounds, the placeholder wallet balance, auto-jump and presentation
//! timings. Defaults match the shipped game; `from_env` lets an operator
//! override them without a rebuild.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::core::money::Amount;

/// Presentation delays between an action and its deferred continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Start action to round active.
    pub start: Duration,
    /// Jump flight duration.
    pub jump: Duration,
    /// Extra delay after landing before the second collision sample.
    pub landing_sample: Duration,
    /// Trap crash reveal before settlement.
    pub trap_reveal: Duration,
    /// Vehicle crash reveal before settlement.
    pub vehicle_strike_reveal: Duration,
    /// Settlement to results shown.
    pub round_end: Duration,
    /// Spacing of rewatch steps.
    pub rewatch_step: Duration,
    /// Landing to the next automatic jump.
    pub auto_jump: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            start: Duration::from_millis(450),
            jump: Duration::from_millis(400),
            landing_sample: Duration::from_millis(24),
            trap_reveal: Duration::from_millis(140),
            vehicle_strike_reveal: Duration::from_millis(180),
            round_end: Duration::from_millis(900),
            rewatch_step: Duration::from_millis(420),
            auto_jump: Duration::from_millis(140),
        }
    }
}

impl Timings {
    /// Every delay zero. Useful for simulations.
    pub fn instant() -> Self {
        Self {
            start: Duration::ZERO,
            jump: Duration::ZERO,
            landing_sample: Duration::ZERO,
            trap_reveal: Duration::ZERO,
            vehicle_strike_reveal: Duration::ZERO,
            round_end: Duration::ZERO,
            rewatch_step: Duration::ZERO,
            auto_jump: Duration::ZERO,
        }
    }

    /// Scale every delay by `percent` (100 = unchanged).
    pub fn scaled(self, percent: u32) -> Self {
        let scale = |d: Duration| d * percent / 100;
        Self {
            start: scale(self.start),
            jump: scale(self.jump),
            landing_sample: scale(self.landing_sample),
            trap_reveal: scale(self.trap_reveal),
            vehicle_strike_reveal: scale(self.vehicle_strike_reveal),
            round_end: scale(self.round_end),
            rewatch_step: scale(self.rewatch_step),
            auto_jump: scale(self.auto_jump),
        }
    }

    /// Take-off to landing evaluation.
    pub fn flight(&self) -> Duration {
        self.jump + self.landing_sample
    }
}

/// Configuration for a round session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Smallest accepted bet.
    pub min_bet: Amount,
    /// Largest accepted bet.
    pub max_bet: Amount,
    /// Wallet balance. A placeholder; no ledger is kept.
    pub wallet_balance: Amount,
    /// Jump automatically after start and after each landing.
    pub auto_jump: bool,
    /// Presentation delays.
    pub timings: Timings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_bet: Amount::from_units(1),
            max_bet: Amount::from_units(1000),
            wallet_balance: Amount::from_units(100),
            auto_jump: false,
            timings: Timings::default(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; unparseable ones keep their
    /// defaults and log a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let time_scale: u32 = env_or("CROSSING_TIME_SCALE", 100);
        Self {
            min_bet: positive_env_or("CROSSING_MIN_BET", defaults.min_bet),
            max_bet: env_or("CROSSING_MAX_BET", defaults.max_bet),
            wallet_balance: env_or("CROSSING_WALLET_BALANCE", defaults.wallet_balance),
            auto_jump: std::env::var("CROSSING_AUTO_JUMP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.auto_jump),
            timings: defaults.timings.scaled(time_scale),
        }
    }

    /// Largest bet currently allowed: `min(wallet_balance, max_bet)`.
    pub fn bet_cap(&self) -> Amount {
        self.wallet_balance.min(self.max_bet)
    }

    /// Builder: set auto-jump.
    pub fn with_auto_jump(mut self, auto_jump: bool) -> Self {
        self.auto_jump = auto_jump;
        self
    }

    /// Builder: set timings.
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "ignoring unparseable config value");
            default
        }),
        Err(_) => default,
    }
}

/// Like `env_or`, but a zero amount is rejected.
fn positive_env_or(key: &str, default: Amount) -> Amount {
    let value = env_or(key, default);
    if value.is_zero() {
        warn!(key, "amount must be positive, keeping default");
        return default;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.min_bet, Amount::from_units(1));
        assert_eq!(config.bet_cap(), Amount::from_units(100));
        assert!(!config.auto_jump);
        assert_eq!(config.timings.flight(), Duration::from_millis(424));
    }

    #[test]
    fn test_bet_cap_uses_smaller_bound() {
        let config = SessionConfig {
            wallet_balance: Amount::from_units(5_000),
            ..SessionConfig::default()
        };
        assert_eq!(config.bet_cap(), Amount::from_units(1000));
    }

    #[test]
    fn test_scaled_timings() {
        let half = Timings::default().scaled(50);
        assert_eq!(half.start, Duration::from_millis(225));
        assert_eq!(half.landing_sample, Duration::from_millis(12));
        assert_eq!(Timings::default().scaled(0), Timings::instant());
    }

    #[test]
    fn test_env_or_falls_back() {
        std::env::set_var("CROSSING_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("CROSSING_TEST_GARBAGE", 7u32), 7);
        std::env::set_var("CROSSING_TEST_AMOUNT", "2.5");
        assert_eq!(
            env_or("CROSSING_TEST_AMOUNT", Amount::ZERO),
            Amount::from_thousandths(2_500)
        );
        assert_eq!(env_or("CROSSING_TEST_UNSET_KEY", 3u32), 3);
    }

    #[test]
    fn test_zero_min_bet_keeps_default() {
        std::env::set_var("CROSSING_TEST_ZERO_MIN", "0");
        assert_eq!(
            positive_env_or("CROSSING_TEST_ZERO_MIN", Amount::from_units(1)),
            Amount::from_units(1)
        );
        std::env::set_var("CROSSING_TEST_POSITIVE_MIN", "0.5");
        assert_eq!(
            positive_env_or("CROSSING_TEST_POSITIVE_MIN", Amount::from_units(1)),
            Amount::from_thousandths(500)
        );
    }
}
