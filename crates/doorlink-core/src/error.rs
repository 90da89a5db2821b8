//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Control Channel Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Control channel error: {message}")]
    Channel { message: String },

    // ─────────────────────────────────────────────────────────────
    // Hardware Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Hardware fault on {device}: {message}")]
    Hardware { device: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Create a [`Error::Hardware`] error for the named device (`"relay"`, `"sensor"`).
    pub fn hardware(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hardware {
            device: device.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Check if this error should stop the device
    ///
    /// Connectivity and message-level problems never surface as errors from
    /// the control loop; they are absorbed where they happen.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Hardware { .. } | Error::ConfigInvalid { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::channel("connection refused");
        assert_eq!(err.to_string(), "Control channel error: connection refused");

        let err = Error::hardware("relay", "write failed");
        assert_eq!(err.to_string(), "Hardware fault on relay: write failed");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_hardware_errors_are_fatal() {
        let err = Error::hardware("sensor", "read failed");
        assert!(err.is_fatal());
        assert!(!Error::channel("reset by peer").is_fatal());
    }

    #[test]
    fn test_config_invalid_is_fatal() {
        let err = Error::config_invalid("port must be non-zero");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("port must be non-zero"));
        assert!(!Error::config("unused").is_fatal());
    }
}
