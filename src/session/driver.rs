//! Tokio Timer Driver
//!
//! Wall-clock shell around a `RoundSession`. Commands arrive over an mpsc
//! channel, each scheduled continuation sleeps on its own task and is fed
//! back into the session when it fires, and every event is published on a
//! broadcast channel. This layer is **non-deterministic**; every decision
//! is still made inside `game/`.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::money::Amount;
use crate::game::collision::CollisionProbe;
use crate::game::events::RoundEvent;
use crate::game::ladder::Difficulty;
use crate::game::machine::{ConfigError, Continuation, RoundSession, StepResult};
use crate::game::state::RoundSnapshot;
use crate::session::history::RoundHistory;

/// Command channel capacity.
const COMMAND_BUFFER: usize = 64;

/// Event channel capacity.
const EVENT_BUFFER: usize = 256;

/// Requests accepted by the driver.
#[derive(Debug)]
pub enum Command {
    /// Confirm a bet.
    Configure {
        /// Stake.
        bet: Amount,
        /// Chosen difficulty.
        difficulty: Difficulty,
        /// Acceptance or rejection.
        reply: oneshot::Sender<Result<(), ConfigError>>,
    },
    /// Start the configured round.
    Start,
    /// Jump to the next lane.
    Jump,
    /// Take the current multiplier.
    CashOut,
    /// Discard the round.
    Reset,
    /// Repeat the last bet on a fresh round.
    PlayAgain {
        /// Acceptance or rejection.
        reply: oneshot::Sender<Result<(), ConfigError>>,
    },
    /// Rewatch the latest settlement.
    Rewatch,
    /// Rewatch a specific record.
    RewatchSnapshot(Box<RoundSnapshot>),
    /// Latest settlement.
    LastSnapshot {
        /// The settlement, if any.
        reply: oneshot::Sender<Option<RoundSnapshot>>,
    },
    /// Stop the driver.
    Shutdown,
}

/// Driver failures seen by a handle.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The driver task has stopped.
    #[error("driver has shut down")]
    Closed,

    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Cloneable front end to a running driver.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<RoundEvent>,
}

impl DriverHandle {
    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: Command) -> Result<(), DriverError> {
        self.commands.send(command).await.map_err(|_| DriverError::Closed)
    }

    /// Confirm a bet; rejections come back as `DriverError::Config`.
    pub async fn configure(&self, bet: Amount, difficulty: Difficulty) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Configure {
            bet,
            difficulty,
            reply,
        })
        .await?;
        rx.await.map_err(|_| DriverError::Closed)??;
        Ok(())
    }

    /// Start the configured round.
    pub async fn start(&self) -> Result<(), DriverError> {
        self.send(Command::Start).await
    }

    /// Jump to the next lane.
    pub async fn jump(&self) -> Result<(), DriverError> {
        self.send(Command::Jump).await
    }

    /// Cash out.
    pub async fn cash_out(&self) -> Result<(), DriverError> {
        self.send(Command::CashOut).await
    }

    /// Discard the round.
    pub async fn reset(&self) -> Result<(), DriverError> {
        self.send(Command::Reset).await
    }

    /// Repeat the last bet on a fresh round.
    pub async fn play_again(&self) -> Result<(), DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::PlayAgain { reply }).await?;
        rx.await.map_err(|_| DriverError::Closed)??;
        Ok(())
    }

    /// Rewatch the latest settlement.
    pub async fn rewatch(&self) -> Result<(), DriverError> {
        self.send(Command::Rewatch).await
    }

    /// Rewatch a specific record.
    pub async fn rewatch_snapshot(&self, snapshot: RoundSnapshot) -> Result<(), DriverError> {
        self.send(Command::RewatchSnapshot(Box::new(snapshot))).await
    }

    /// Latest settlement, if any.
    pub async fn last_snapshot(&self) -> Result<Option<RoundSnapshot>, DriverError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::LastSnapshot { reply }).await?;
        rx.await.map_err(|_| DriverError::Closed)
    }

    /// Stop the driver.
    pub async fn shutdown(&self) -> Result<(), DriverError> {
        self.send(Command::Shutdown).await
    }
}

/// Owns a session and runs its continuations on tokio timers.
pub struct TimerDriver<P> {
    session: RoundSession,
    probe: P,
    history: RoundHistory,
    commands: mpsc::Receiver<Command>,
    fired_tx: mpsc::UnboundedSender<Continuation>,
    fired_rx: mpsc::UnboundedReceiver<Continuation>,
    events: broadcast::Sender<RoundEvent>,
    timers: Vec<JoinHandle<()>>,
}

impl<P> TimerDriver<P>
where
    P: CollisionProbe + Send + 'static,
{
    /// Spawn the driver task. The join handle yields the session history
    /// once the driver shuts down.
    pub fn spawn(session: RoundSession, probe: P) -> (DriverHandle, JoinHandle<RoundHistory>) {
        let (command_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();

        let driver = TimerDriver {
            session,
            probe,
            history: RoundHistory::new(),
            commands,
            fired_tx,
            fired_rx,
            events: events.clone(),
            timers: Vec::new(),
        };

        let handle = DriverHandle {
            commands: command_tx,
            events,
        };
        (handle, tokio::spawn(driver.run()))
    }

    async fn run(mut self) -> RoundHistory {
        info!("Round driver started (session {})", self.history.session_id());

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(Command::Shutdown) | None => break,
                        Some(command) => self.handle_command(command),
                    }
                }
                Some(continuation) = self.fired_rx.recv() => {
                    let result = self.session.resume(continuation, &self.probe);
                    self.publish(result);
                }
            }
        }

        self.cancel_timers();
        info!("Round driver stopped after {} rounds", self.history.len());
        self.history
    }

    fn handle_command(&mut self, command: Command) {
        debug!("Driver command: {:?}", command);
        match command {
            Command::Configure {
                bet,
                difficulty,
                reply,
            } => {
                let outcome = self.session.configure(bet, difficulty).map(|result| {
                    self.cancel_timers();
                    self.publish(result);
                });
                let _ = reply.send(outcome);
            }
            Command::Start => {
                let result = self.session.start();
                if !result.is_empty() {
                    self.cancel_timers();
                }
                self.publish(result);
            }
            Command::Jump => {
                let result = self.session.jump(&self.probe);
                self.publish(result);
            }
            Command::CashOut => {
                let result = self.session.cash_out();
                self.publish(result);
            }
            Command::Reset => {
                self.cancel_timers();
                let result = self.session.reset();
                self.publish(result);
            }
            Command::PlayAgain { reply } => {
                let outcome = self.session.play_again().map(|result| {
                    self.cancel_timers();
                    self.publish(result);
                });
                let _ = reply.send(outcome);
            }
            Command::Rewatch => {
                let epoch = self.session.epoch();
                let result = self.session.rewatch();
                self.publish_after(epoch, result);
            }
            Command::RewatchSnapshot(snapshot) => {
                let epoch = self.session.epoch();
                let result = self.session.rewatch_snapshot(*snapshot);
                self.publish_after(epoch, result);
            }
            Command::LastSnapshot { reply } => {
                let _ = reply.send(self.session.last_snapshot().cloned());
            }
            Command::Shutdown => {}
        }
    }

    /// Publish, dropping timers first if the session moved past `epoch`.
    fn publish_after(&mut self, epoch: u64, result: StepResult) {
        if self.session.epoch() != epoch {
            self.cancel_timers();
        }
        self.publish(result);
    }

    fn publish(&mut self, result: StepResult) {
        for event in result.events {
            if let Some(snapshot) = event.snapshot().filter(|_| event.is_settlement()) {
                self.history.record(snapshot.clone());
            }
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }

        self.timers.retain(|timer| !timer.is_finished());
        for continuation in result.scheduled {
            let fired = self.fired_tx.clone();
            self.timers.push(tokio::spawn(async move {
                tokio::time::sleep(continuation.delay()).await;
                let _ = fired.send(continuation);
            }));
        }
    }

    fn cancel_timers(&mut self) {
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}
