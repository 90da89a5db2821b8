//! Test utilities for the control loop
//!
//! Hand-written fakes for the hardware traits and the control channel. Each
//! fake is a cheap handle over shared state: clone it, give one copy to the
//! engine, and inspect or drive the other from the test.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use doorlink_channel::ChannelEvent;
use doorlink_core::prelude::*;

use crate::config::Settings;
use crate::engine::Engine;
use crate::hal::{Clock, Hardware, RelayOutput, RingSensor};
use crate::transport::Transport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ─────────────────────────────────────────────────────────────────────────────
// Relay
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RelayLog {
    writes: Vec<bool>,
    energized: bool,
    fail_next_energize: bool,
}

/// Records every successful relay write
#[derive(Debug, Clone, Default)]
pub struct FakeRelay {
    inner: Arc<Mutex<RelayLog>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Levels written so far, `true` = energized
    pub fn writes(&self) -> Vec<bool> {
        lock(&self.inner).writes.clone()
    }

    pub fn is_energized(&self) -> bool {
        lock(&self.inner).energized
    }

    /// Make the next energize request fail with a hardware fault
    pub fn fail_next_energize(&self) {
        lock(&self.inner).fail_next_energize = true;
    }
}

impl RelayOutput for FakeRelay {
    fn set_energized(&mut self, energized: bool) -> Result<()> {
        let mut log = lock(&self.inner);
        if energized && log.fail_next_energize {
            log.fail_next_energize = false;
            return Err(Error::hardware("fake relay", "injected energize failure"));
        }
        log.writes.push(energized);
        log.energized = energized;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sensor
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SensorLevel {
    value: u16,
    failing: bool,
}

/// Returns whatever value the test last set
#[derive(Debug, Clone, Default)]
pub struct FakeSensor {
    inner: Arc<Mutex<SensorLevel>>,
}

impl FakeSensor {
    pub fn new(value: u16) -> Self {
        let sensor = Self::default();
        sensor.set(value);
        sensor
    }

    pub fn set(&self, value: u16) {
        lock(&self.inner).value = value;
    }

    /// Every subsequent read fails with a hardware fault
    pub fn fail(&self) {
        lock(&self.inner).failing = true;
    }
}

impl RingSensor for FakeSensor {
    fn read(&mut self) -> Result<u16> {
        let level = lock(&self.inner);
        if level.failing {
            return Err(Error::hardware("fake sensor", "injected read failure"));
        }
        Ok(level.value)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────────────────

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    monotonic_ms: Arc<AtomicU64>,
    epoch_seconds: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: u64) {
        self.monotonic_ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.monotonic_ms.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_epoch_seconds(&self, secs: i64) {
        self.epoch_seconds.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> u64 {
        self.monotonic_ms.load(Ordering::SeqCst)
    }

    fn epoch_seconds(&self) -> i64 {
        self.epoch_seconds.load(Ordering::SeqCst)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TransportLog {
    incoming: VecDeque<ChannelEvent>,
    live_connection: Option<u64>,
    sent: Vec<(u64, String)>,
    dropped: Vec<(u64, String)>,
    closed: bool,
}

/// Scripted event source; records every send attempt
///
/// Accepts frames for any connection until [`FakeTransport::set_live_connection`]
/// names one; after that, frames for any other id are dropped the way
/// [`ChannelClient`](doorlink_channel::ChannelClient) drops them.
#[derive(Debug, Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<TransportLog>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for the engine's next drain
    pub fn push(&self, event: ChannelEvent) {
        lock(&self.inner).incoming.push_back(event);
    }

    /// Make `connection_id` the only connection that accepts frames
    pub fn set_live_connection(&self, connection_id: Option<u64>) {
        lock(&self.inner).live_connection = connection_id;
    }

    /// Every frame accepted for sending, in order
    pub fn sent(&self) -> Vec<String> {
        lock(&self.inner)
            .sent
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Accepted frames with the connection id they were sent on
    pub fn sent_with_ids(&self) -> Vec<(u64, String)> {
        lock(&self.inner).sent.clone()
    }

    /// Frames refused because their connection was not the live one
    pub fn dropped(&self) -> Vec<(u64, String)> {
        lock(&self.inner).dropped.clone()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.inner).closed
    }
}

impl Transport for FakeTransport {
    fn try_next_event(&mut self) -> Option<ChannelEvent> {
        lock(&self.inner).incoming.pop_front()
    }

    fn send_text(&mut self, connection_id: u64, text: String) -> bool {
        let mut log = lock(&self.inner);
        match log.live_connection {
            Some(live) if live != connection_id => {
                log.dropped.push((connection_id, text));
                false
            }
            _ => {
                log.sent.push((connection_id, text));
                true
            }
        }
    }

    fn close(&mut self) {
        lock(&self.inner).closed = true;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine wiring
// ─────────────────────────────────────────────────────────────────────────────

/// Test-side handles to an engine's fakes
#[derive(Debug, Clone, Default)]
pub struct TestRig {
    pub relay: FakeRelay,
    pub sensor: FakeSensor,
    pub clock: ManualClock,
    pub transport: FakeTransport,
}

impl TestRig {
    pub fn hardware(&self) -> Hardware {
        Hardware {
            relay: Box::new(self.relay.clone()),
            sensor: Box::new(self.sensor.clone()),
            clock: Box::new(self.clock.clone()),
        }
    }
}

/// An engine with default settings wired to fresh fakes
pub fn test_engine() -> (Engine, TestRig) {
    test_engine_with(&Settings::default())
}

pub fn test_engine_with(settings: &Settings) -> (Engine, TestRig) {
    let rig = TestRig::default();
    let engine = Engine::new(Box::new(rig.transport.clone()), rig.hardware(), settings);
    (engine, rig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_relay_injected_failure_is_one_shot() {
        let relay = FakeRelay::new();
        let mut driver = relay.clone();
        relay.fail_next_energize();

        assert!(driver.set_energized(true).is_err());
        assert!(driver.set_energized(true).is_ok());
        assert_eq!(relay.writes(), vec![true]);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        clock.set_ms(100);
        clock.advance_ms(25);
        assert_eq!(clock.monotonic_ms(), 125);
    }

    #[test]
    fn test_fake_transport_drains_in_order() {
        let transport = FakeTransport::new();
        let mut engine_side = transport.clone();
        transport.push(ChannelEvent::Disconnected {
            reason: "a".to_string(),
        });
        transport.push(ChannelEvent::Disconnected {
            reason: "b".to_string(),
        });

        assert_eq!(
            engine_side.try_next_event(),
            Some(ChannelEvent::Disconnected {
                reason: "a".to_string()
            })
        );
        assert!(engine_side.try_next_event().is_some());
        assert!(engine_side.try_next_event().is_none());
    }

    #[test]
    fn test_fake_transport_drops_frames_for_other_connections() {
        let transport = FakeTransport::new();
        let mut engine_side = transport.clone();
        assert!(engine_side.send_text(7, "any".to_string()));

        transport.set_live_connection(Some(2));
        assert!(!engine_side.send_text(1, "old".to_string()));
        assert!(engine_side.send_text(2, "new".to_string()));

        assert_eq!(transport.sent(), vec!["any".to_string(), "new".to_string()]);
        assert_eq!(transport.dropped(), vec![(1, "old".to_string())]);
    }
}
