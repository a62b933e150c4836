use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tracing::info;

use crate::error::{FixtureError, Result};
use crate::traits::{Fixture, Rgb};

const DEFAULT_HISTORY_LIMIT: usize = 4096;

/// A command received by a [`RecordingFixture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    TurnOn,
    TurnOff,
    StartStreaming,
    StopStreaming,
    SetColor(Rgb),
    SetBrightness(u8),
}

/// How a [`RecordingFixture`] fails when failure injection is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Fail with [`FixtureError::Reported`].
    Reported,
    /// Fail with [`FixtureError::Connectivity`].
    Connectivity,
}

#[derive(Debug, Default)]
struct Behaviour {
    failure: Option<FailureMode>,
    latency: Duration,
}

/// In-memory fixture that logs and records every command.
///
/// Backs `--dry-run` and the bridge tests. Failure injection and artificial
/// latency apply to every command, `connect` included.
#[derive(Debug)]
pub struct RecordingFixture {
    name: String,
    history: Mutex<VecDeque<Command>>,
    history_limit: usize,
    behaviour: Mutex<Behaviour>,
}

impl RecordingFixture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            history: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
            behaviour: Mutex::new(Behaviour::default()),
        }
    }

    /// Keep at most `limit` commands; older ones are discarded first.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make every subsequent command fail (`Some`) or succeed (`None`).
    pub fn fail_with(&self, failure: Option<FailureMode>) {
        self.behaviour_mut().failure = failure;
    }

    /// Delay every subsequent command by `latency` before it takes effect.
    pub fn set_latency(&self, latency: Duration) {
        self.behaviour_mut().latency = latency;
    }

    /// Commands that completed successfully, oldest first.
    pub fn commands(&self) -> Vec<Command> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .copied()
            .collect()
    }

    /// Successful `set_color` commands, oldest first.
    pub fn colors(&self) -> Vec<Rgb> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                Command::SetColor(color) => Some(color),
                _ => None,
            })
            .collect()
    }

    /// Successful `set_brightness` commands, oldest first.
    pub fn brightness_levels(&self) -> Vec<u8> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                Command::SetBrightness(percent) => Some(percent),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn behaviour_mut(&self) -> std::sync::MutexGuard<'_, Behaviour> {
        self.behaviour
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn execute(&self, command: Command) -> Result<()> {
        let (failure, latency) = {
            let behaviour = self.behaviour_mut();
            (behaviour.failure, behaviour.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match failure {
            Some(FailureMode::Reported) => {
                return Err(FixtureError::Reported {
                    fixture: self.name.clone(),
                    message: format!("injected failure on {command:?}"),
                })
            }
            Some(FailureMode::Connectivity) => {
                return Err(FixtureError::Connectivity {
                    fixture: self.name.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "injected connectivity failure",
                    ),
                })
            }
            None => {}
        }

        info!(fixture = %self.name, ?command, "fixture command");

        let mut history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(command);
        Ok(())
    }
}

impl Fixture for RecordingFixture {
    async fn connect(&self) -> Result<()> {
        self.execute(Command::Connect).await
    }

    async fn turn_on(&self) -> Result<()> {
        self.execute(Command::TurnOn).await
    }

    async fn turn_off(&self) -> Result<()> {
        self.execute(Command::TurnOff).await
    }

    async fn start_streaming(&self) -> Result<()> {
        self.execute(Command::StartStreaming).await
    }

    async fn stop_streaming(&self) -> Result<()> {
        self.execute(Command::StopStreaming).await
    }

    async fn set_color(&self, color: Rgb, _transition: Duration) -> Result<()> {
        self.execute(Command::SetColor(color)).await
    }

    async fn set_brightness(&self, percent: u8, _transition: Duration) -> Result<()> {
        self.execute(Command::SetBrightness(percent)).await
    }
}
