use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use artglow_bridge::{BridgeConfig, DispatchConfig, FixtureId, DEFAULT_CHANNELS_PER_FIXTURE};
use artglow_fixture::normalize_address;
use artglow_frame::MAX_CHANNELS;
use artglow_transport::ARTNET_PORT;
use serde::Deserialize;

use crate::exit::{CliError, CliResult};

/// Highest 15-bit Art-Net port-address.
const MAX_PORT_ADDRESS: u16 = 0x7fff;

/// Contents of the bridge configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// UDP address the Art-Net receiver binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub port_address: u16,
    /// First channel handed out to fixtures without an explicit `dmx_start`.
    #[serde(default = "default_start_address")]
    pub start_address: u16,
    #[serde(default = "default_channels_per_fixture")]
    pub channels_per_fixture: u16,
    #[serde(default)]
    pub power_on: bool,
    pub fixtures: Vec<FixtureSettings>,
    #[serde(default)]
    pub timing: Timing,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureSettings {
    /// `host` or `host:port`. Its normalized `host:port` form is the
    /// fixture's id.
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dmx_start: Option<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    pub rate_limit_ms: u64,
    pub error_backoff_ms: u64,
    /// 0 disables the per-command timeout.
    pub command_timeout_ms: u64,
    pub settle_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        let dispatch = DispatchConfig::default();
        let bridge = BridgeConfig::default();
        Self {
            rate_limit_ms: millis(dispatch.rate_limit),
            error_backoff_ms: millis(dispatch.error_backoff),
            command_timeout_ms: dispatch.command_timeout.map(millis).unwrap_or(0),
            settle_ms: millis(bridge.settle),
        }
    }
}

/// A configured fixture with its start channel resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFixture {
    pub id: FixtureId,
    pub name: String,
    pub dmx_start: u16,
}

impl Settings {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            CliError::config(format!("failed reading {}: {err}", path.display()))
        })?;
        Self::parse(&text)
            .map_err(|err| CliError::config(format!("{}: {}", path.display(), err.message)))
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        let settings: Self = serde_json::from_str(text)
            .map_err(|err| CliError::config(format!("invalid configuration: {err}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that need the whole file. Channel layout (ranges, overlaps) is
    /// checked by the bridge.
    fn validate(&self) -> CliResult<()> {
        if self.fixtures.is_empty() {
            return Err(CliError::config("at least one fixture must be configured"));
        }
        if self.channels_per_fixture < DEFAULT_CHANNELS_PER_FIXTURE {
            return Err(CliError::config(format!(
                "channels_per_fixture must be at least {DEFAULT_CHANNELS_PER_FIXTURE}, got {}",
                self.channels_per_fixture
            )));
        }
        if self.port_address > MAX_PORT_ADDRESS {
            return Err(CliError::config(format!(
                "port_address must be at most {MAX_PORT_ADDRESS}, got {}",
                self.port_address
            )));
        }

        let mut seen = HashSet::new();
        for fixture in &self.fixtures {
            if fixture.address.trim().is_empty() {
                return Err(CliError::config("fixture address must not be empty"));
            }
            if !seen.insert(normalize_address(&fixture.address)) {
                return Err(CliError::config(format!(
                    "fixture address {} is configured more than once",
                    fixture.address
                )));
            }
        }
        Ok(())
    }

    /// Resolve start channels; fixtures without one are packed from
    /// `start_address` by their position in the file.
    pub fn plan(&self) -> CliResult<Vec<PlannedFixture>> {
        self.fixtures
            .iter()
            .enumerate()
            .map(|(index, fixture)| {
                let dmx_start = match fixture.dmx_start {
                    Some(start) => start,
                    None => {
                        let start = u32::from(self.start_address)
                            + index as u32 * u32::from(self.channels_per_fixture);
                        if start > MAX_CHANNELS as u32 {
                            return Err(CliError::config(format!(
                                "no channels left for fixture {} (would start at {start})",
                                fixture.address
                            )));
                        }
                        start as u16
                    }
                };
                Ok(PlannedFixture {
                    id: FixtureId::new(normalize_address(&fixture.address)),
                    name: fixture
                        .name
                        .clone()
                        .unwrap_or_else(|| fixture.address.clone()),
                    dmx_start,
                })
            })
            .collect()
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        let timeout = match self.timing.command_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        BridgeConfig {
            port_address: self.port_address,
            channels_per_fixture: self.channels_per_fixture,
            dispatch: DispatchConfig {
                rate_limit: Duration::from_millis(self.timing.rate_limit_ms),
                error_backoff: Duration::from_millis(self.timing.error_backoff_ms),
                command_timeout: timeout,
            },
            settle: Duration::from_millis(self.timing.settle_ms),
            power_on: self.power_on,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], ARTNET_PORT))
}

fn default_start_address() -> u16 {
    1
}

fn default_channels_per_fixture() -> u16 {
    DEFAULT_CHANNELS_PER_FIXTURE
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
