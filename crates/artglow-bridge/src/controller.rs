use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artglow_fixture::{Fixture, FixtureError};
use artglow_frame::{decode_dmx, Decoded};
use artglow_transport::{ArtNetReceiver, OP_DMX};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::channel_map::{ChannelMap, FixtureId, DEFAULT_CHANNELS_PER_FIXTURE};
use crate::dispatcher::{bounded, DispatchConfig, Dispatcher, Submit};
use crate::error::{BridgeError, Result};

/// Brightness every fixture is set to before streaming starts.
const BASELINE_BRIGHTNESS: u8 = 100;

/// Bridge-wide settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Art-Net port-address to accept frames for.
    pub port_address: u16,
    /// Width of each fixture's channel block.
    pub channels_per_fixture: u16,
    /// Worker timing, shared by all fixtures.
    pub dispatch: DispatchConfig,
    /// Pause after connecting and after entering streaming mode, giving the
    /// fixture time to settle.
    pub settle: Duration,
    /// Switch fixtures on during initialization.
    pub power_on: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port_address: 0,
            channels_per_fixture: DEFAULT_CHANNELS_PER_FIXTURE,
            dispatch: DispatchConfig::default(),
            settle: Duration::from_secs(1),
            power_on: false,
        }
    }
}

/// A configured fixture handed to [`BridgeController::start`].
pub struct FixtureEntry<F> {
    pub id: FixtureId,
    /// First (red) channel, 1-based.
    pub dmx_start: u16,
    pub fixture: Arc<F>,
}

impl<F> FixtureEntry<F> {
    pub fn new(id: impl Into<FixtureId>, dmx_start: u16, fixture: Arc<F>) -> Self {
        Self {
            id: id.into(),
            dmx_start,
            fixture,
        }
    }
}

/// Frame-path counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCounters {
    /// Frames for our port-address.
    pub accepted: u64,
    /// Frames for other port-addresses.
    pub skipped: u64,
    /// Frames too short to decode.
    pub malformed: u64,
    /// Fixture states discarded because the mailbox was full.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    skipped: AtomicU64,
    malformed: AtomicU64,
    dropped: AtomicU64,
}

/// Wires decoding, the channel map and the per-fixture dispatchers together.
pub struct BridgeController<F: Fixture> {
    config: BridgeConfig,
    map: ChannelMap,
    dispatchers: HashMap<FixtureId, Dispatcher>,
    fixtures: Vec<(FixtureId, Arc<F>)>,
    cancel: CancellationToken,
    workers: TaskTracker,
    counters: Counters,
}

impl<F: Fixture> BridgeController<F> {
    /// Initialize fixtures and spawn one worker per fixture that came up.
    ///
    /// A fixture reporting an error is skipped. A fixture that cannot be
    /// reached aborts startup, as does ending up with no fixtures at all.
    pub async fn start(config: BridgeConfig, entries: Vec<FixtureEntry<F>>) -> Result<Self> {
        ChannelMap::layout(
            entries.iter().map(|entry| (entry.id.clone(), entry.dmx_start)),
            config.channels_per_fixture,
        )
        .validate()?;

        let mut ready: Vec<FixtureEntry<F>> = Vec::with_capacity(entries.len());
        for entry in entries {
            match initialize(&entry, &config).await {
                Ok(()) => ready.push(entry),
                Err(err) if err.is_recoverable() => {
                    warn!(fixture = %entry.id, error = %err, "skipping fixture that failed to initialize");
                }
                Err(err) => {
                    release(&ready, &config).await;
                    return Err(BridgeError::Connectivity {
                        fixture: entry.id,
                        source: err,
                    });
                }
            }
        }

        if ready.is_empty() {
            return Err(BridgeError::NoFixturesAvailable);
        }

        let map = ChannelMap::build(
            ready.iter().map(|entry| (entry.id.clone(), entry.dmx_start)),
            config.channels_per_fixture,
        );

        let cancel = CancellationToken::new();
        let workers = TaskTracker::new();
        let mut dispatchers = HashMap::with_capacity(ready.len());
        let mut fixtures = Vec::with_capacity(ready.len());
        for entry in ready {
            let dispatcher = Dispatcher::spawn(
                entry.id.clone(),
                Arc::clone(&entry.fixture),
                config.dispatch,
                cancel.clone(),
                &workers,
            );
            dispatchers.insert(entry.id.clone(), dispatcher);
            fixtures.push((entry.id, entry.fixture));
        }

        info!(
            fixtures = fixtures.len(),
            port_address = config.port_address,
            "bridge started"
        );

        Ok(Self {
            config,
            map,
            dispatchers,
            fixtures,
            cancel,
            workers,
            counters: Counters::default(),
        })
    }

    /// Channel map of the fixtures being driven.
    pub fn channel_map(&self) -> &ChannelMap {
        &self.map
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Ids of the fixtures being driven, in channel order.
    pub fn fixture_ids(&self) -> impl Iterator<Item = &FixtureId> {
        self.fixtures.iter().map(|(id, _)| id)
    }

    /// Decode an ArtDmx body and offer each fixture its new state.
    ///
    /// Never waits on fixture I/O.
    pub fn handle_frame(&self, raw: &[u8]) {
        let frame = match decode_dmx(raw, self.config.port_address) {
            Ok(Decoded::Frame(frame)) => frame,
            Ok(Decoded::Skip { .. }) => {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(err) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, "dropping malformed dmx frame");
                return;
            }
        };
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);

        debug!(
            version = frame.version,
            port_address = frame.port_address(),
            sequence = frame.sequence,
            channels = frame.length,
            "received dmx frame"
        );

        for mapping in self.map.iter() {
            let Some(dispatcher) = self.dispatchers.get(&mapping.id) else {
                continue;
            };
            if dispatcher.submit(mapping.extract(&frame)) == Submit::Dropped {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Route the receiver's ArtDmx packets to [`handle_frame`](Self::handle_frame).
    pub fn attach(self: &Arc<Self>, receiver: &mut ArtNetReceiver) {
        let controller = Arc::clone(self);
        receiver.register_handler(OP_DMX, move |_src, body| controller.handle_frame(body));
    }

    pub fn counters(&self) -> FrameCounters {
        FrameCounters {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            malformed: self.counters.malformed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Leave streaming mode on every fixture, then stop and await all workers.
    ///
    /// Errors are logged; shutdown always completes.
    pub async fn shutdown(&self) {
        for (id, fixture) in &self.fixtures {
            let stopped = bounded(
                id,
                self.config.dispatch.command_timeout,
                fixture.stop_streaming(),
            )
            .await;
            if let Err(err) = stopped {
                warn!(fixture = %id, error = %err, "failed to stop streaming mode");
            }
        }

        self.cancel.cancel();
        self.workers.close();
        self.workers.wait().await;

        let counters = self.counters();
        info!(
            accepted = counters.accepted,
            skipped = counters.skipped,
            malformed = counters.malformed,
            dropped = counters.dropped,
            "bridge stopped"
        );
    }
}

/// Connect, clear any stale streaming session, set the baseline brightness
/// and enter streaming mode.
async fn initialize<F: Fixture>(
    entry: &FixtureEntry<F>,
    config: &BridgeConfig,
) -> std::result::Result<(), FixtureError> {
    let limit = config.dispatch.command_timeout;
    let fixture = entry.fixture.as_ref();

    bounded(&entry.id, limit, fixture.connect()).await?;
    settle(config.settle).await;

    bounded(&entry.id, limit, fixture.stop_streaming()).await?;
    if config.power_on {
        bounded(&entry.id, limit, fixture.turn_on()).await?;
    }
    bounded(
        &entry.id,
        limit,
        fixture.set_brightness(BASELINE_BRIGHTNESS, Duration::ZERO),
    )
    .await?;
    bounded(&entry.id, limit, fixture.start_streaming()).await?;
    settle(config.settle).await;

    debug!(fixture = %entry.id, "fixture initialized");
    Ok(())
}

/// Best-effort exit from streaming mode for fixtures initialized before a
/// fatal startup error.
async fn release<F: Fixture>(entries: &[FixtureEntry<F>], config: &BridgeConfig) {
    for entry in entries {
        let stopped = bounded(
            &entry.id,
            config.dispatch.command_timeout,
            entry.fixture.stop_streaming(),
        )
        .await;
        if let Err(err) = stopped {
            debug!(fixture = %entry.id, error = %err, "failed to release fixture");
        }
    }
}

async fn settle(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

#[cfg(test)]
mod tests {
    use artglow_fixture::{Command, FailureMode, RecordingFixture, Rgb};

    use super::*;

    fn quick_config() -> BridgeConfig {
        BridgeConfig {
            settle: Duration::ZERO,
            ..BridgeConfig::default()
        }
    }

    fn dmx(port_address: u16, channels: &[u8]) -> Vec<u8> {
        let mut raw = vec![0x00, 0x0e, 1, 0];
        raw.extend_from_slice(&port_address.to_le_bytes());
        raw.extend_from_slice(&(channels.len() as u16).to_be_bytes());
        raw.extend_from_slice(channels);
        raw
    }

    #[tokio::test(start_paused = true)]
    async fn initializes_fixtures_in_order() {
        let lamp = Arc::new(RecordingFixture::new("lamp"));
        let bridge = BridgeController::start(
            BridgeConfig {
                power_on: true,
                ..quick_config()
            },
            vec![FixtureEntry::new("lamp", 1, Arc::clone(&lamp))],
        )
        .await
        .unwrap();

        assert_eq!(
            lamp.commands(),
            vec![
                Command::Connect,
                Command::StopStreaming,
                Command::TurnOn,
                Command::SetBrightness(100),
                Command::StartStreaming,
            ]
        );
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reported_failure_skips_fixture() {
        let good = Arc::new(RecordingFixture::new("good"));
        let faulty = Arc::new(RecordingFixture::new("faulty"));
        faulty.fail_with(Some(FailureMode::Reported));

        let bridge = BridgeController::start(
            quick_config(),
            vec![
                FixtureEntry::new("faulty", 1, Arc::clone(&faulty)),
                FixtureEntry::new("good", 5, Arc::clone(&good)),
            ],
        )
        .await
        .unwrap();

        let ids: Vec<_> = bridge.fixture_ids().map(FixtureId::as_str).collect();
        assert_eq!(ids, vec!["good"]);
        assert_eq!(bridge.channel_map().len(), 1);
        assert!(bridge.channel_map().get(&FixtureId::from("faulty")).is_none());
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_fixture_aborts_startup() {
        let first = Arc::new(RecordingFixture::new("first"));
        let unreachable = Arc::new(RecordingFixture::new("unreachable"));
        unreachable.fail_with(Some(FailureMode::Connectivity));

        let result = BridgeController::start(
            quick_config(),
            vec![
                FixtureEntry::new("first", 1, Arc::clone(&first)),
                FixtureEntry::new("unreachable", 5, Arc::clone(&unreachable)),
            ],
        )
        .await;

        match result {
            Err(BridgeError::Connectivity { fixture, .. }) => {
                assert_eq!(fixture.as_str(), "unreachable");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("startup should fail"),
        }
        // The fixture that did come up is taken out of streaming mode again.
        assert_eq!(first.commands().last(), Some(&Command::StopStreaming));
    }

    #[tokio::test(start_paused = true)]
    async fn no_surviving_fixture_is_fatal() {
        let faulty = Arc::new(RecordingFixture::new("faulty"));
        faulty.fail_with(Some(FailureMode::Reported));
        let result =
            BridgeController::start(quick_config(), vec![FixtureEntry::new("faulty", 1, faulty)])
                .await;
        assert!(matches!(result, Err(BridgeError::NoFixturesAvailable)));

        let empty: Vec<FixtureEntry<RecordingFixture>> = Vec::new();
        let result = BridgeController::start(quick_config(), empty).await;
        assert!(matches!(result, Err(BridgeError::NoFixturesAvailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_layout_is_rejected_before_any_io() {
        let a = Arc::new(RecordingFixture::new("a"));
        let b = Arc::new(RecordingFixture::new("b"));
        let result = BridgeController::start(
            quick_config(),
            vec![
                FixtureEntry::new("a", 1, Arc::clone(&a)),
                FixtureEntry::new("b", 3, Arc::clone(&b)),
            ],
        )
        .await;

        assert!(matches!(result, Err(BridgeError::OverlappingChannels { .. })));
        assert!(a.commands().is_empty());
        assert!(b.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn frames_for_other_ports_are_skipped() {
        let lamp = Arc::new(RecordingFixture::new("lamp"));
        let bridge = BridgeController::start(
            quick_config(),
            vec![FixtureEntry::new("lamp", 1, Arc::clone(&lamp))],
        )
        .await
        .unwrap();
        lamp.clear();

        bridge.handle_frame(&dmx(1, &[255, 255, 255, 255]));
        bridge.handle_frame(&[0x00, 0x0e, 1]);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(lamp.commands().is_empty());
        assert_eq!(
            bridge.counters(),
            FrameCounters {
                accepted: 0,
                skipped: 1,
                malformed: 1,
                dropped: 0,
            }
        );
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn frame_fans_out_to_every_fixture() {
        let left = Arc::new(RecordingFixture::new("left"));
        let right = Arc::new(RecordingFixture::new("right"));
        let bridge = BridgeController::start(
            quick_config(),
            vec![
                FixtureEntry::new("left", 1, Arc::clone(&left)),
                FixtureEntry::new("right", 5, Arc::clone(&right)),
            ],
        )
        .await
        .unwrap();
        left.clear();
        right.clear();

        bridge.handle_frame(&dmx(0, &[255, 0, 0, 128, 0, 0, 255, 255]));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(left.colors(), vec![Rgb::new(255, 0, 0)]);
        assert_eq!(left.brightness_levels(), vec![50]);
        assert_eq!(right.colors(), vec![Rgb::new(0, 0, 255)]);
        assert_eq!(right.brightness_levels(), vec![99]);
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_frames_is_coalesced() {
        let lamp = Arc::new(RecordingFixture::new("lamp"));
        let bridge = BridgeController::start(
            quick_config(),
            vec![FixtureEntry::new("lamp", 1, Arc::clone(&lamp))],
        )
        .await
        .unwrap();
        lamp.clear();

        for level in 1..=10u8 {
            bridge.handle_frame(&dmx(0, &[level, 0, 0, 255]));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(lamp.colors(), vec![Rgb::new(1, 0, 0)]);
        assert_eq!(bridge.counters().dropped, 9);
        bridge.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_streaming_and_workers() {
        let lamp = Arc::new(RecordingFixture::new("lamp"));
        let bridge = BridgeController::start(
            quick_config(),
            vec![FixtureEntry::new("lamp", 1, Arc::clone(&lamp))],
        )
        .await
        .unwrap();
        lamp.clear();

        bridge.shutdown().await;
        assert_eq!(lamp.commands(), vec![Command::StopStreaming]);

        bridge.handle_frame(&dmx(0, &[1, 2, 3, 4]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(lamp.commands(), vec![Command::StopStreaming]);
    }
}
