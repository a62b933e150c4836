use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use artglow_bridge::{BridgeConfig, BridgeController, FixtureEntry};
use artglow_fixture::{Command, FailureMode, RecordingFixture, Rgb};
use artglow_frame::encode_dmx;
use artglow_transport::{ArtNetReceiver, ArtNetSender, OP_DMX};
use bytes::BytesMut;
use tokio_util::sync::CancellationToken;

fn quick_config() -> BridgeConfig {
    BridgeConfig {
        settle: Duration::ZERO,
        ..BridgeConfig::default()
    }
}

fn dmx_body(sequence: u8, port_address: u16, channels: &[u8]) -> Vec<u8> {
    let mut body = BytesMut::new();
    encode_dmx(sequence, 0, port_address, channels, &mut body).unwrap();
    body.to_vec()
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn red_at_half_brightness() {
    let lamp = Arc::new(RecordingFixture::new("lamp"));
    let bridge = BridgeController::start(
        quick_config(),
        vec![FixtureEntry::new("10.0.0.20", 1, Arc::clone(&lamp))],
    )
    .await
    .unwrap();
    lamp.clear();

    bridge.handle_frame(&dmx_body(1, 0, &[255, 0, 0, 128, 0, 0, 0, 0]));
    advance(500).await;

    assert_eq!(
        lamp.commands(),
        vec![
            Command::SetColor(Rgb::new(255, 0, 0)),
            Command::SetBrightness(50),
        ]
    );
    assert_eq!(bridge.counters().accepted, 1);
    bridge.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failing_fixture_does_not_hold_back_others() {
    let healthy = Arc::new(RecordingFixture::new("healthy"));
    let flaky = Arc::new(RecordingFixture::new("flaky"));
    let bridge = BridgeController::start(
        quick_config(),
        vec![
            FixtureEntry::new("flaky", 1, Arc::clone(&flaky)),
            FixtureEntry::new("healthy", 5, Arc::clone(&healthy)),
        ],
    )
    .await
    .unwrap();
    healthy.clear();
    flaky.fail_with(Some(FailureMode::Connectivity));

    for step in 1..=5u8 {
        bridge.handle_frame(&dmx_body(step, 0, &[step, 0, 0, 0, step, 0, 0, 0]));
        advance(100).await;
    }

    let expected: Vec<_> = (1..=5u8).map(|step| Rgb::new(step, 0, 0)).collect();
    assert_eq!(healthy.colors(), expected);
    assert!(flaky.colors().is_empty());
    bridge.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn five_channel_layout_reads_brightness_from_last_channel() {
    let first = Arc::new(RecordingFixture::new("first"));
    let second = Arc::new(RecordingFixture::new("second"));
    let bridge = BridgeController::start(
        BridgeConfig {
            channels_per_fixture: 5,
            ..quick_config()
        },
        vec![
            FixtureEntry::new("first", 1, Arc::clone(&first)),
            FixtureEntry::new("second", 6, Arc::clone(&second)),
        ],
    )
    .await
    .unwrap();
    first.clear();
    second.clear();

    bridge.handle_frame(&dmx_body(
        1,
        0,
        &[10, 20, 30, 0, 128, 40, 50, 60, 0, 0],
    ));
    advance(200).await;

    assert_eq!(first.colors(), vec![Rgb::new(10, 20, 30)]);
    assert_eq!(first.brightness_levels(), vec![50]);
    assert_eq!(second.colors(), vec![Rgb::new(40, 50, 60)]);
    assert_eq!(second.brightness_levels(), vec![0]);
    bridge.shutdown().await;
}

#[tokio::test]
async fn frames_arrive_over_udp() {
    let lamp = Arc::new(RecordingFixture::new("lamp"));
    let bridge = Arc::new(
        BridgeController::start(
            BridgeConfig {
                port_address: 0x0102,
                ..quick_config()
            },
            vec![FixtureEntry::new("lamp", 1, Arc::clone(&lamp))],
        )
        .await
        .unwrap(),
    );
    lamp.clear();

    let mut receiver = ArtNetReceiver::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap())
        .await
        .unwrap();
    bridge.attach(&mut receiver);
    let target = receiver.local_addr().unwrap();

    let stop = CancellationToken::new();
    let listener = tokio::spawn({
        let stop = stop.clone();
        async move { receiver.run(stop).await }
    });

    let mut sender = ArtNetSender::connect(target).await.unwrap();
    sender
        .send(OP_DMX, &dmx_body(1, 0x0003, &[1, 1, 1, 255]))
        .await
        .unwrap();
    sender
        .send(OP_DMX, &dmx_body(2, 0x0102, &[0, 0, 255, 255]))
        .await
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while lamp.colors().is_empty() && tokio::time::Instant::now() < deadline {
        advance(10).await;
    }

    assert_eq!(lamp.colors(), vec![Rgb::new(0, 0, 255)]);
    assert_eq!(lamp.brightness_levels(), vec![99]);
    let counters = bridge.counters();
    assert_eq!((counters.accepted, counters.skipped), (1, 1));

    stop.cancel();
    listener.await.unwrap().unwrap();
    bridge.shutdown().await;
}
