use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use artglow_fixture::{Fixture, FixtureError, Rgb};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace};

use crate::channel_map::FixtureId;
use crate::state::FixtureState;

/// Timing of a fixture worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Pause after every applied state; caps the per-fixture command rate.
    pub rate_limit: Duration,
    /// Pause after a failed command before taking the next state.
    pub error_backoff: Duration,
    /// Upper bound on a single fixture command. `None` waits forever.
    pub command_timeout: Option<Duration>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rate_limit: Duration::from_millis(50),
            error_backoff: Duration::from_secs(5),
            command_timeout: Some(Duration::from_secs(2)),
        }
    }
}

/// Outcome of [`Dispatcher::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    /// The state is waiting in the mailbox.
    Queued,
    /// The mailbox already held a state; this one was discarded.
    Dropped,
    /// The worker has stopped.
    Closed,
}

/// Single-slot mailbox in front of one fixture's worker.
///
/// `submit` never waits: while the worker still holds an unconsumed state,
/// newer states are discarded. The fixture is only guaranteed to end up at
/// some recent state, not to see every one.
#[derive(Debug)]
pub struct Dispatcher {
    id: FixtureId,
    mailbox: mpsc::Sender<FixtureState>,
}

impl Dispatcher {
    /// Spawn the worker for `fixture` on `tracker`; it runs until `shutdown`
    /// is cancelled.
    pub fn spawn<F: Fixture>(
        id: FixtureId,
        fixture: Arc<F>,
        config: DispatchConfig,
        shutdown: CancellationToken,
        tracker: &TaskTracker,
    ) -> Self {
        let (mailbox, inbox) = mpsc::channel(1);
        let worker = Worker {
            id: id.clone(),
            fixture,
            inbox,
            config,
            applied_color: None,
            applied_percent: None,
        };
        tracker.spawn(worker.run(shutdown));
        Self { id, mailbox }
    }

    pub fn id(&self) -> &FixtureId {
        &self.id
    }

    /// Offer a state to the worker without waiting.
    pub fn submit(&self, state: FixtureState) -> Submit {
        match self.mailbox.try_send(state) {
            Ok(()) => Submit::Queued,
            Err(TrySendError::Full(state)) => {
                debug!(fixture = %self.id, ?state, "dropping state update, previous one still pending");
                Submit::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                trace!(fixture = %self.id, "worker stopped, ignoring state update");
                Submit::Closed
            }
        }
    }
}

/// Drains one fixture's mailbox.
///
/// `WaitForState -> Apply -> RateLimitSleep` on success,
/// `WaitForState -> Apply -> ErrorBackoff` on failure. Only cancellation ends
/// the loop.
struct Worker<F> {
    id: FixtureId,
    fixture: Arc<F>,
    inbox: mpsc::Receiver<FixtureState>,
    config: DispatchConfig,
    applied_color: Option<Rgb>,
    applied_percent: Option<u8>,
}

impl<F: Fixture> Worker<F> {
    async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                more = self.step() => {
                    if !more {
                        break;
                    }
                }
            }
        }
        debug!(fixture = %self.id, "fixture worker stopped");
    }

    async fn step(&mut self) -> bool {
        let Some(state) = self.inbox.recv().await else {
            return false;
        };

        let pause = match self.apply(state).await {
            Ok(()) => self.config.rate_limit,
            Err(err) => {
                error!(
                    fixture = %self.id,
                    error = %err,
                    backoff = ?self.config.error_backoff,
                    "fixture command failed"
                );
                self.config.error_backoff
            }
        };

        tokio::time::sleep(pause).await;
        true
    }

    async fn apply(&mut self, state: FixtureState) -> Result<(), FixtureError> {
        let color = state.color();
        if self.applied_color != Some(color) {
            bounded(
                &self.id,
                self.config.command_timeout,
                self.fixture.set_color(color, Duration::ZERO),
            )
            .await?;
            self.applied_color = Some(color);
        }

        let percent = state.brightness_percent();
        if self.applied_percent != Some(percent) {
            bounded(
                &self.id,
                self.config.command_timeout,
                self.fixture.set_brightness(percent, Duration::ZERO),
            )
            .await?;
            self.applied_percent = Some(percent);
        }

        Ok(())
    }
}

/// Await a fixture command, failing with [`FixtureError::Timeout`] past `limit`.
pub(crate) async fn bounded<T>(
    id: &FixtureId,
    limit: Option<Duration>,
    command: impl Future<Output = Result<T, FixtureError>>,
) -> Result<T, FixtureError> {
    let Some(limit) = limit else {
        return command.await;
    };
    match tokio::time::timeout(limit, command).await {
        Ok(result) => result,
        Err(_) => Err(FixtureError::Timeout {
            fixture: id.to_string(),
            timeout: limit,
        }),
    }
}
