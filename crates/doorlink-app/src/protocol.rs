//! Inbound command decoding
//!
//! Every discard path ends in a [`Decoded`] value rather than an error, so the
//! engine can log it and move on. Nothing here ever produces a reply frame.

use serde_json::Value;
use thiserror::Error;

use doorlink_core::prelude::*;
use doorlink_core::{Command, CommandKind, DEVICE_COMMAND_TYPE};

/// Bytes of a binary frame shown in diagnostics
const HEX_PREVIEW_LIMIT: usize = 64;

/// Unlock duration resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockPolicy {
    /// Used when `duration` is absent or null
    pub default_seconds: u64,
    /// Longer requests are clamped to this
    pub max_seconds: u64,
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self {
            default_seconds: doorlink_core::DEFAULT_UNLOCK_SECONDS,
            max_seconds: 30,
        }
    }
}

impl UnlockPolicy {
    /// Resolve an optional requested duration to the seconds to hold.
    pub fn resolve(&self, requested: Option<u64>) -> u64 {
        match requested {
            None => self.default_seconds,
            Some(secs) if secs > self.max_seconds => {
                warn!(
                    "Requested unlock of {}s exceeds maximum, clamping to {}s",
                    secs, self.max_seconds
                );
                self.max_seconds
            }
            Some(secs) => secs,
        }
    }
}

/// Why a device command was discarded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("payload is not valid JSON: {0}")]
    Malformed(String),

    #[error("device command has no cmd field")]
    MissingCmd,

    #[error("unknown command: {0}")]
    UnknownCmd(String),

    #[error("invalid duration: {0}")]
    InvalidDuration(String),
}

/// Outcome of decoding one text frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A valid command to execute
    Command(Command),
    /// Not a device command; dropped without comment
    Ignored,
    /// A device command that cannot be executed
    Rejected(Rejection),
}

/// Decode a text frame into a command.
pub fn decode_command(text: &str, policy: &UnlockPolicy) -> Decoded {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => return Decoded::Rejected(Rejection::Malformed(e.to_string())),
    };

    let Some(message) = value.as_object() else {
        return Decoded::Ignored;
    };

    if message.get("type").and_then(Value::as_str) != Some(DEVICE_COMMAND_TYPE) {
        return Decoded::Ignored;
    }

    let cmd = match message.get("cmd") {
        None | Some(Value::Null) => return Decoded::Rejected(Rejection::MissingCmd),
        Some(Value::String(cmd)) => cmd.as_str(),
        Some(other) => return Decoded::Rejected(Rejection::UnknownCmd(other.to_string())),
    };

    match CommandKind::from_wire(cmd) {
        Some(CommandKind::Unlock) => match unlock_duration(message.get("duration")) {
            Ok(requested) => Decoded::Command(Command::unlock(policy.resolve(requested))),
            Err(rejection) => Decoded::Rejected(rejection),
        },
        None => Decoded::Rejected(Rejection::UnknownCmd(cmd.to_string())),
    }
}

fn unlock_duration(field: Option<&Value>) -> std::result::Result<Option<u64>, Rejection> {
    match field {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| Rejection::InvalidDuration(value.to_string())),
    }
}

/// Lowercase hex of at most the first 64 bytes, with an ellipsis when cut.
pub fn hex_preview(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(HEX_PREVIEW_LIMIT)];
    let mut out: String = shown.iter().map(|b| format!("{:02x}", b)).collect();
    if bytes.len() > HEX_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}
