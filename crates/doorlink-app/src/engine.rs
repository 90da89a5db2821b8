//! Control loop
//!
//! The [`Engine`] owns every piece of device state and drives it from a
//! single task. Each tick drains pending channel events in arrival order,
//! then takes one sensor sample. An unlock holds the tick for its whole
//! duration, so nothing else runs while the door is open.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use doorlink_channel::{ChannelEvent, Frame};
use doorlink_core::prelude::*;
use doorlink_core::{Command, CommandKind, StatusEvent};

use crate::actuator::Actuator;
use crate::config::Settings;
use crate::detector::RingDetector;
use crate::hal::{Clock, Hardware, RingSensor};
use crate::protocol::{decode_command, hex_preview, Decoded, UnlockPolicy};
use crate::transport::Transport;

/// Connection state as seen by the control loop, driven only by channel events
///
/// Lags the real channel by however many events are still queued. Frames are
/// sent against `connection_id`, so a stale `Connected` never reaches a newer
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlChannelState {
    #[default]
    Disconnected,
    Connected { connection_id: u64 },
}

pub struct Engine {
    transport: Box<dyn Transport>,
    channel_state: ControlChannelState,
    detector: RingDetector,
    actuator: Actuator,
    sensor: Box<dyn RingSensor>,
    clock: Box<dyn Clock>,
    policy: UnlockPolicy,
    sample_interval: Duration,
}

impl Engine {
    pub fn new(transport: Box<dyn Transport>, hardware: Hardware, settings: &Settings) -> Self {
        let Hardware {
            relay,
            sensor,
            clock,
        } = hardware;

        Self {
            transport,
            channel_state: ControlChannelState::Disconnected,
            detector: RingDetector::new(settings.detector_config()),
            actuator: Actuator::new(relay),
            sensor,
            clock,
            policy: settings.unlock_policy(),
            sample_interval: settings.sample_interval(),
        }
    }

    pub fn channel_state(&self) -> ControlChannelState {
        self.channel_state
    }

    pub fn detector(&self) -> &RingDetector {
        &self.detector
    }

    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }

    /// Put the relay in its safe state before the first tick.
    pub fn start(&mut self) -> Result<()> {
        self.actuator.force_safe()
    }

    /// One control loop iteration.
    pub async fn tick(&mut self) -> Result<()> {
        while let Some(event) = self.transport.try_next_event() {
            self.handle_channel_event(event).await?;
        }
        self.sample()
    }

    /// Run ticks every sample interval until `shutdown` resolves or a fatal
    /// error occurs. The relay is forced safe and the channel closed on exit.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start()?;
        info!(
            "Control loop started (sample interval {}ms)",
            self.sample_interval.as_millis()
        );

        let mut ticker = tokio::time::interval(self.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Control loop stopping on shutdown request");
                    break Ok(());
                }
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(()) => {}
                        Err(e) if e.is_fatal() => {
                            error!("Control loop stopping on fatal error: {}", e);
                            break Err(e);
                        }
                        Err(e) => warn!("Control loop iteration failed: {}", e),
                    }
                }
            }
        };

        self.stop();
        result
    }

    pub async fn handle_channel_event(&mut self, event: ChannelEvent) -> Result<()> {
        match event {
            ChannelEvent::Connected { url, connection_id } => {
                info!("[ws] connected to {} (connection {})", url, connection_id);
                self.channel_state = ControlChannelState::Connected { connection_id };
                let ntp_timestamp = self.clock.epoch_seconds().max(0);
                self.send_status(StatusEvent::Connected { ntp_timestamp });
                Ok(())
            }
            ChannelEvent::Disconnected { reason } => {
                warn!("[ws] disconnected: {}", reason);
                self.channel_state = ControlChannelState::Disconnected;
                Ok(())
            }
            ChannelEvent::Frame(Frame::Text(text)) => {
                debug!("[ws] received text: {}", text);
                self.handle_text(&text).await
            }
            ChannelEvent::Frame(Frame::Binary(bytes)) => {
                debug!(
                    "[ws] received binary frame, {} bytes: {}",
                    bytes.len(),
                    hex_preview(&bytes)
                );
                Ok(())
            }
        }
    }

    async fn handle_text(&mut self, text: &str) -> Result<()> {
        match decode_command(text, &self.policy) {
            Decoded::Command(command) => self.dispatch(command).await,
            Decoded::Ignored => {
                trace!("[ws] ignoring non-command message");
                Ok(())
            }
            Decoded::Rejected(reason) => {
                warn!("[ws] discarding command: {}", reason);
                Ok(())
            }
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<()> {
        debug!(
            "[ws] dispatching {} ({}s)",
            command.kind.as_str(),
            command.duration_seconds
        );
        match command.kind {
            CommandKind::Unlock => self.actuator.activate(command.duration()).await,
        }
    }

    fn sample(&mut self) -> Result<()> {
        let value = self.sensor.read()?;
        let now_ms = self.clock.monotonic_ms();

        if let Some(edge) = self.detector.step(value, now_ms) {
            self.send_status(StatusEvent::RingStateChanged {
                ringing: edge.ringing,
                timestamp: edge.at_ms,
            });
        }
        Ok(())
    }

    /// Serialize and send a status frame. Dropped while disconnected.
    fn send_status(&mut self, event: StatusEvent) -> bool {
        let ControlChannelState::Connected { connection_id } = self.channel_state else {
            debug!("[ws] not connected, dropping status {}", event.status());
            return false;
        };

        match event.to_frame() {
            Ok(frame) => self.transport.send_text(connection_id, frame),
            Err(e) => {
                error!("Failed to encode status {}: {}", event.status(), e);
                false
            }
        }
    }

    fn stop(&mut self) {
        if let Err(e) = self.actuator.force_safe() {
            error!("Could not force relay safe on exit: {}", e);
        }
        self.transport.close();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("channel_state", &self.channel_state)
            .field("detector", &self.detector)
            .field("actuator", &self.actuator)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
