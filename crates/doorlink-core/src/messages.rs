//! Wire message definitions
//!
//! Inbound frames carry device commands (`{"type":"device.cmd", ...}`);
//! outbound frames carry status announcements (`{"type":"device.status", ...}`).
//! Both are fixed-shape JSON text frames.

use std::time::Duration;

use serde::Serialize;

use crate::error::Result;

/// `type` value identifying an inbound device command.
pub const DEVICE_COMMAND_TYPE: &str = "device.cmd";

/// `type` value identifying an outbound status frame.
pub const DEVICE_STATUS_TYPE: &str = "device.status";

/// Unlock hold used when a command omits `duration`.
pub const DEFAULT_UNLOCK_SECONDS: u64 = 5;

// ─────────────────────────────────────────────────────────
// Commands (inbound)
// ─────────────────────────────────────────────────────────

/// Kind of a decoded device command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Energize the door strike relay for a duration
    Unlock,
}

impl CommandKind {
    /// The `cmd` field value for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Unlock => "unlock",
        }
    }

    /// Look up a kind by its `cmd` field value
    pub fn from_wire(cmd: &str) -> Option<Self> {
        match cmd {
            "unlock" => Some(CommandKind::Unlock),
            _ => None,
        }
    }
}

/// A decoded inbound instruction, consumed as soon as it is dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: CommandKind,
    pub duration_seconds: u64,
}

impl Command {
    pub fn unlock(duration_seconds: u64) -> Self {
        Self {
            kind: CommandKind::Unlock,
            duration_seconds,
        }
    }

    /// Hold duration for an actuation
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }
}

// ─────────────────────────────────────────────────────────
// Status events (outbound)
// ─────────────────────────────────────────────────────────

/// An outbound status announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Sent once per established control-channel connection
    Connected {
        /// Wall-clock seconds since the Unix epoch
        ntp_timestamp: i64,
    },
    /// Sent on every committed doorbell state transition
    RingStateChanged {
        ringing: bool,
        /// Monotonic milliseconds since boot
        timestamp: u64,
    },
}

#[derive(Serialize)]
struct ConnectedFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    status: &'static str,
    timestamp_ntp: i64,
}

#[derive(Serialize)]
struct RingFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    status: &'static str,
    timestamp: u64,
}

impl StatusEvent {
    /// The `status` field value for this event
    pub fn status(&self) -> &'static str {
        match self {
            StatusEvent::Connected { .. } => "connected",
            StatusEvent::RingStateChanged { ringing: true, .. } => "ring.start",
            StatusEvent::RingStateChanged { ringing: false, .. } => "ring.stop",
        }
    }

    /// Serialize to a single outbound text frame
    pub fn to_frame(&self) -> Result<String> {
        let json = match *self {
            StatusEvent::Connected { ntp_timestamp } => serde_json::to_string(&ConnectedFrame {
                kind: DEVICE_STATUS_TYPE,
                status: self.status(),
                timestamp_ntp: ntp_timestamp,
            })?,
            StatusEvent::RingStateChanged { timestamp, .. } => serde_json::to_string(&RingFrame {
                kind: DEVICE_STATUS_TYPE,
                status: self.status(),
                timestamp,
            })?,
        };
        Ok(json)
    }
}
