use std::sync::Arc;

use artglow_bridge::{BridgeController, FixtureEntry};
use artglow_fixture::{Fixture, RecordingFixture, YeelightBulb, YeelightConfig};
use artglow_transport::ArtNetReceiver;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cmd::{runtime, RunArgs};
use crate::config::{PlannedFixture, Settings};
use crate::exit::{bridge_error, io_error, transport_error, CliResult, SUCCESS};

pub fn run(args: RunArgs) -> CliResult<i32> {
    let settings = Settings::load(&args.config)?;
    let fixtures = settings.plan()?;
    let runtime = runtime()?;

    if args.dry_run {
        let entries = entries(fixtures, |fixture| RecordingFixture::new(fixture.name.clone()));
        runtime.block_on(serve(&settings, entries))
    } else {
        let yeelight = YeelightConfig::default();
        let entries = entries(fixtures, |fixture| {
            YeelightBulb::with_config(fixture.id.as_str(), yeelight.clone())
        });
        runtime.block_on(serve(&settings, entries))
    }
}

fn entries<F, M>(fixtures: Vec<PlannedFixture>, make: M) -> Vec<FixtureEntry<F>>
where
    M: Fn(&PlannedFixture) -> F,
{
    fixtures
        .into_iter()
        .map(|fixture| {
            let handle = Arc::new(make(&fixture));
            FixtureEntry::new(fixture.id, fixture.dmx_start, handle)
        })
        .collect()
}

/// Bind, bring the fixtures up and forward frames until interrupted.
async fn serve<F: Fixture>(settings: &Settings, entries: Vec<FixtureEntry<F>>) -> CliResult<i32> {
    let mut receiver = ArtNetReceiver::bind(settings.listen)
        .await
        .map_err(|err| transport_error("failed to bind art-net socket", err))?;

    let bridge = BridgeController::start(settings.bridge_config(), entries)
        .await
        .map_err(|err| bridge_error("failed to start bridge", err))?;
    let bridge = Arc::new(bridge);
    bridge.attach(&mut receiver);

    let stop = CancellationToken::new();
    let result = tokio::select! {
        received = receiver.run(stop.clone()) => {
            received.map_err(|err| transport_error("art-net receive failed", err))
        }
        signal = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            signal.map_err(|err| io_error("failed to listen for ctrl-c", err))
        }
    };
    stop.cancel();

    bridge.shutdown().await;
    result.map(|()| SUCCESS)
}
