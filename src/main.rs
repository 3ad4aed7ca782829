//! Chicken Crossing Server
//!
//! Headless demo of the round-resolution engine. Plays a scripted round on
//! real timers, rewatches it, then simulates a batch of rounds per
//! difficulty to report the empirical return to player.

use anyhow::{bail, Context, Result};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chicken_crossing::{
    game::{
        audit::audit_snapshot,
        collision::NoProbe,
        events::{RoundEvent, RoundEventData},
        timeline::Timeline,
    },
    session::{encode_share_token, TimerDriver},
    Amount, Difficulty, RoundSession, SessionConfig, Timings, VERSION,
};

/// Lane the scripted round cashes out at.
const CASH_OUT_LANE: u32 = 3;

/// Rounds simulated per difficulty.
const BATCH_ROUNDS: u32 = 2_000;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Chicken Crossing Server v{}", VERSION);

    let config = SessionConfig::from_env();
    info!(
        "Bets {} to {} (wallet {}), auto-jump {}",
        config.min_bet, config.max_bet, config.wallet_balance, config.auto_jump
    );
    for difficulty in Difficulty::ALL {
        info!(
            "{}: {} lanes, first step survives {:.4}, top multiplier {}",
            difficulty,
            difficulty.max_safe_lanes(),
            difficulty.survival_probability(1),
            difficulty.multiplier_at(difficulty.max_safe_lanes())
        );
    }

    demo_round(config.clone()).await?;
    simulate_batch(&config);
    Ok(())
}

/// Play one round on the timer driver, then rewatch it.
async fn demo_round(config: SessionConfig) -> Result<()> {
    info!("=== Starting Demo Round ===");

    let bet = config.bet_cap().min(Amount::from_units(10));
    let (handle, task) = TimerDriver::spawn(RoundSession::new(config), NoProbe);
    let mut events = handle.subscribe();

    handle
        .configure(bet, Difficulty::Medium)
        .await
        .context("configure demo round")?;
    handle.start().await?;
    wait_for(&mut events, |e| matches!(e, RoundEventData::Started { .. })).await?;

    let mut settled = None;
    for _ in 0..CASH_OUT_LANE {
        handle.jump().await?;
        let event = wait_for(&mut events, |e| {
            matches!(
                e,
                RoundEventData::LaneAdvanced { .. } | RoundEventData::RoundSettled { .. }
            )
        })
        .await?;
        match &event.data {
            RoundEventData::LaneAdvanced { lane, multiplier } => {
                info!("Crossed lane {} at {}", lane, multiplier);
            }
            _ => {
                settled = event.snapshot().cloned();
                break;
            }
        }
    }

    let snapshot = match settled {
        Some(snapshot) => snapshot,
        None => {
            handle.cash_out().await?;
            let event = wait_for(&mut events, |e| {
                matches!(e, RoundEventData::RoundSettled { .. })
            })
            .await?;
            event.snapshot().cloned().context("settlement without snapshot")?
        }
    };

    info!(
        "Round {} ended {:?} on lane {}: payout {} ({})",
        snapshot.round_id,
        snapshot.outcome,
        snapshot.final_lane,
        snapshot.payout,
        snapshot.multiplier()
    );
    info!("Share token: {}", encode_share_token(&snapshot)?);

    info!("=== Rewatching ===");
    handle.rewatch().await?;
    let finished = wait_for(&mut events, |e| {
        matches!(e, RoundEventData::ReplayFinished { .. })
    })
    .await?;
    let replayed = finished.snapshot().context("replay without snapshot")?;

    if replayed.digest() == snapshot.digest() {
        info!("REWATCH VERIFIED: digest {}", hex::encode(snapshot.digest()));
    } else {
        bail!("rewatch ended on a different record");
    }

    let report = audit_snapshot(&snapshot);
    if report.valid {
        info!("Audit passed ({:?})", report.cause);
    } else {
        warn!("Audit failed: {:?}", report.errors);
    }

    handle.shutdown().await?;
    let history = task.await?;
    info!(
        "Session {}: {} rounds, wagered {}, paid {}",
        history.session_id(),
        history.len(),
        history.total_wagered(),
        history.total_paid()
    );
    Ok(())
}

/// Wait for the first event matching `pred`.
async fn wait_for<F>(events: &mut broadcast::Receiver<RoundEvent>, mut pred: F) -> Result<RoundEvent>
where
    F: FnMut(&RoundEventData) -> bool,
{
    loop {
        match events.recv().await {
            Ok(event) if pred(&event.data) => return Ok(event),
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event receiver lagged by {}", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => bail!("driver closed its event channel"),
        }
    }
}

/// Simulate a batch per difficulty, cashing out at a fixed lane.
fn simulate_batch(config: &SessionConfig) {
    info!("=== Simulating {} rounds per difficulty ===", BATCH_ROUNDS);

    let config = config.clone().with_timings(Timings::instant()).with_auto_jump(false);
    let bet = config.min_bet;

    for difficulty in Difficulty::ALL {
        let mut session = RoundSession::new(config.clone());
        let mut timeline = Timeline::new();
        let mut wagered = Amount::ZERO;
        let mut paid = Amount::ZERO;

        for _ in 0..BATCH_ROUNDS {
            timeline.apply(session.reset());
            match session.configure(bet, difficulty) {
                Ok(result) => timeline.apply(result),
                Err(e) => {
                    warn!("Batch configure rejected: {}", e);
                    return;
                }
            };
            timeline.apply(session.start());
            timeline.run_until_idle(&mut session, &NoProbe);

            while session.round().map_or(false, |r| !r.is_resolved()) {
                let lane = session.round().map_or(0, |r| r.current_lane());
                if lane >= CASH_OUT_LANE {
                    timeline.apply(session.cash_out());
                } else {
                    timeline.apply(session.jump(&NoProbe));
                }
                timeline.run_until_idle(&mut session, &NoProbe);
            }

            if let Some(snapshot) = session.last_snapshot() {
                wagered = wagered.saturating_add(snapshot.bet);
                paid = paid.saturating_add(snapshot.payout);
            }
        }

        let rtp = if wagered.is_zero() {
            0.0
        } else {
            paid.as_f64() / wagered.as_f64() * 100.0
        };
        info!(
            "{}: cash out at lane {}, wagered {}, paid {}, RTP {:.2}%",
            difficulty, CASH_OUT_LANE, wagered, paid, rtp
        );
    }
}
