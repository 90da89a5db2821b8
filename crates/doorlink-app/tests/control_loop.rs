//! End-to-end control loop scenarios against fake hardware and channel

use std::time::Duration;

use doorlink_app::test_utils::{test_engine, test_engine_with, TestRig};
use doorlink_app::{ControlChannelState, Engine, RelayState, Settings};
use doorlink_channel::{ChannelEvent, Frame};
use tokio::time::Instant;

const HIGH: u16 = 850;
const LOW: u16 = 30;

fn connected(connection_id: u64) -> ChannelEvent {
    ChannelEvent::Connected {
        url: "wss://door.example.com:443/ws/device".to_string(),
        connection_id,
    }
}

fn disconnected() -> ChannelEvent {
    ChannelEvent::Disconnected {
        reason: "connection reset".to_string(),
    }
}

fn text(s: &str) -> ChannelEvent {
    ChannelEvent::Frame(Frame::Text(s.to_string()))
}

/// Tick once per `step_ms` from `from_ms` up to and including `to_ms`.
async fn run_samples(engine: &mut Engine, rig: &TestRig, from_ms: u64, to_ms: u64, step_ms: u64) {
    let mut now = from_ms;
    while now <= to_ms {
        rig.clock.set_ms(now);
        engine.tick().await.unwrap();
        now += step_ms;
    }
}

fn statuses(rig: &TestRig) -> Vec<String> {
    rig.transport
        .sent()
        .iter()
        .map(|frame| {
            let value: serde_json::Value = serde_json::from_str(frame).unwrap();
            assert_eq!(value["type"], "device.status");
            value["status"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_ring_burst_reports_start_then_stop_once() {
    let (mut engine, rig) = test_engine();
    rig.clock.set_epoch_seconds(1_700_000_000);
    rig.transport.push(connected(1));

    // 11 above-threshold passes within 400ms
    rig.sensor.set(HIGH);
    run_samples(&mut engine, &rig, 0, 400, 40).await;
    assert_eq!(statuses(&rig), vec!["connected", "ring.start"]);

    // Released; the window lapses
    rig.sensor.set(LOW);
    run_samples(&mut engine, &rig, 405, 1_000, 5).await;
    assert_eq!(statuses(&rig), vec!["connected", "ring.start", "ring.stop"]);

    // Steady
    run_samples(&mut engine, &rig, 1_005, 5_000, 5).await;
    assert_eq!(rig.transport.sent().len(), 3);

    let frames = rig.transport.sent();
    assert_eq!(
        frames[1],
        r#"{"type":"device.status","status":"ring.start","timestamp":360}"#
    );
    assert_eq!(
        frames[2],
        r#"{"type":"device.status","status":"ring.stop","timestamp":505}"#
    );
}

#[tokio::test]
async fn test_no_frames_while_down_and_one_announcement_on_reconnect() {
    let (mut engine, rig) = test_engine();
    rig.transport.push(connected(1));
    engine.tick().await.unwrap();
    assert_eq!(statuses(&rig), vec!["connected"]);

    rig.transport.push(disconnected());
    engine.tick().await.unwrap();
    assert_eq!(engine.channel_state(), ControlChannelState::Disconnected);

    // A full ring cycle while down produces no send attempts
    rig.sensor.set(HIGH);
    run_samples(&mut engine, &rig, 10, 200, 10).await;
    rig.sensor.set(LOW);
    run_samples(&mut engine, &rig, 210, 1_000, 10).await;
    assert_eq!(rig.transport.sent().len(), 1);
    assert!(!engine.detector().is_ringing());

    rig.transport.push(connected(2));
    run_samples(&mut engine, &rig, 1_010, 1_500, 10).await;
    assert_eq!(statuses(&rig), vec!["connected", "connected"]);
    assert_eq!(
        engine.channel_state(),
        ControlChannelState::Connected { connection_id: 2 }
    );
}

#[tokio::test]
async fn test_repeated_malformed_frames_change_nothing() {
    let (mut engine, rig) = test_engine();
    rig.transport.push(connected(1));
    rig.sensor.set(HIGH);
    run_samples(&mut engine, &rig, 0, 40, 10).await;
    rig.sensor.set(LOW);
    engine.tick().await.unwrap();

    let detector_before = engine.detector().state().clone();
    let writes_before = rig.relay.writes();
    let sent_before = rig.transport.sent();

    for _ in 0..50 {
        rig.transport
            .push(text(r#"{"type":"device.cmd","cmd":"unlock","duration":-1"#));
        rig.transport
            .push(text(r#"{"type":"device.cmd","cmd":"open_sesame"}"#));
        rig.transport.push(text("{{{{"));
        engine.tick().await.unwrap();
    }

    assert_eq!(engine.detector().state(), &detector_before);
    assert_eq!(rig.relay.writes(), writes_before);
    assert_eq!(engine.actuator().state(), RelayState::DeEnergized);
    assert_eq!(rig.transport.sent(), sent_before);
}

#[tokio::test(start_paused = true)]
async fn test_unlock_defaults_to_five_seconds() {
    let (mut engine, rig) = test_engine();
    rig.transport.push(connected(1));
    rig.transport.push(text(r#"{"type":"device.cmd","cmd":"unlock"}"#));

    let start = Instant::now();
    engine.tick().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(rig.relay.writes(), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_unlock_with_explicit_duration() {
    let (mut engine, rig) = test_engine();
    rig.transport.push(connected(1));
    rig.transport
        .push(text(r#"{"type":"device.cmd","cmd":"unlock","duration":12}"#));

    let start = Instant::now();
    engine.tick().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(12));
    assert_eq!(rig.relay.writes(), vec![true, false]);
    // Unlocking sends nothing back
    assert_eq!(statuses(&rig), vec!["connected"]);
}

#[tokio::test(start_paused = true)]
async fn test_commands_during_hold_run_after_it() {
    let (mut engine, rig) = test_engine();
    rig.transport.push(connected(1));
    rig.transport
        .push(text(r#"{"type":"device.cmd","cmd":"unlock","duration":3}"#));
    rig.transport
        .push(text(r#"{"type":"device.cmd","cmd":"unlock","duration":2}"#));

    let start = Instant::now();
    engine.tick().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(rig.relay.writes(), vec![true, false, true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_configured_cap_clamps_long_unlock() {
    let mut settings = Settings::default();
    settings.relay.max_unlock_seconds = 10;
    let (mut engine, rig) = test_engine_with(&settings);
    rig.transport
        .push(text(r#"{"type":"device.cmd","cmd":"unlock","duration":600}"#));

    let start = Instant::now();
    engine.tick().await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_run_until_serves_commands_and_shuts_down_safe() {
    let (mut engine, rig) = test_engine();
    rig.transport.push(connected(1));
    rig.transport
        .push(text(r#"{"type":"device.cmd","cmd":"unlock","duration":1}"#));

    engine
        .run_until(tokio::time::sleep(Duration::from_secs(3)))
        .await
        .unwrap();

    // start: force safe, unlock pulse, exit: force safe
    assert_eq!(rig.relay.writes(), vec![false, true, false, false]);
    assert_eq!(statuses(&rig), vec!["connected"]);
    assert!(rig.transport.is_closed());
}
