//! Configuration types for doorlink
//!
//! Defines:
//! - `Settings` - The whole device configuration, one section per concern
//! - Section structs with per-field defaults matching the installed hardware

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use doorlink_channel::ChannelConfig;
use doorlink_core::prelude::*;

use crate::detector::RingDetectorConfig;
use crate::protocol::UnlockPolicy;

/// Device configuration, loaded once at startup
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub channel: ChannelSettings,
    pub doorbell: DoorbellSettings,
    pub relay: RelaySettings,
    pub hardware: HardwareSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Check cross-field and range constraints
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::config_invalid(msg));

        if self.server.host.trim().is_empty() {
            return fail("server.host must not be empty");
        }
        if self.server.port == 0 {
            return fail("server.port must be non-zero");
        }
        if !self.server.path.starts_with('/') {
            return fail("server.path must start with '/'");
        }
        if self.channel.reconnect_interval_ms == 0 {
            return fail("channel.reconnect_interval_ms must be non-zero");
        }
        if self.channel.heartbeat_interval_ms == 0 || self.channel.heartbeat_timeout_ms == 0 {
            return fail("channel heartbeat interval and timeout must be non-zero");
        }
        if self.channel.heartbeat_max_missed == 0 {
            return fail("channel.heartbeat_max_missed must be at least 1");
        }
        if self.doorbell.ring_count_threshold == 0 {
            return fail("doorbell.ring_count_threshold must be at least 1");
        }
        if self.doorbell.ring_count_period_ms == 0 {
            return fail("doorbell.ring_count_period_ms must be non-zero");
        }
        if self.doorbell.sample_interval_ms == 0 {
            return fail("doorbell.sample_interval_ms must be non-zero");
        }
        if self.relay.default_unlock_seconds > self.relay.max_unlock_seconds {
            return fail("relay.default_unlock_seconds exceeds relay.max_unlock_seconds");
        }
        Ok(())
    }

    /// Control channel endpoint and timing
    pub fn channel_config(&self) -> Result<ChannelConfig> {
        let config = ChannelConfig::new(
            &self.server.url(),
            self.server.username.clone(),
            self.server.password.clone(),
        )?
        .with_reconnect_interval(Duration::from_millis(self.channel.reconnect_interval_ms))
        .with_heartbeat(
            Duration::from_millis(self.channel.heartbeat_interval_ms),
            Duration::from_millis(self.channel.heartbeat_timeout_ms),
            self.channel.heartbeat_max_missed,
        );
        Ok(config)
    }

    pub fn detector_config(&self) -> RingDetectorConfig {
        RingDetectorConfig {
            analog_threshold: self.doorbell.analog_threshold,
            count_threshold: self.doorbell.ring_count_threshold,
            period_ms: self.doorbell.ring_count_period_ms,
        }
    }

    pub fn unlock_policy(&self) -> UnlockPolicy {
        UnlockPolicy {
            default_seconds: self.relay.default_unlock_seconds,
            max_seconds: self.relay.max_unlock_seconds,
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.doorbell.sample_interval_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [server]
// ─────────────────────────────────────────────────────────────────────────────

/// Control server endpoint and device credentials
#[derive(Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Use `wss://` (TLS) rather than `ws://`
    pub tls: bool,
    pub username: String,
    pub password: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 443,
            path: "/ws/device".to_string(),
            tls: true,
            username: "device".to_string(),
            password: String::new(),
        }
    }
}

impl ServerSettings {
    /// `ws[s]://host:port/path`
    pub fn url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

impl std::fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [channel]
// ─────────────────────────────────────────────────────────────────────────────

/// Reconnect and liveness-ping timing
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelSettings {
    pub reconnect_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub heartbeat_max_missed: u32,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 5_000,
            heartbeat_interval_ms: 15_000,
            heartbeat_timeout_ms: 3_000,
            heartbeat_max_missed: 2,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [doorbell]
// ─────────────────────────────────────────────────────────────────────────────

/// Ring detection thresholds
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DoorbellSettings {
    /// Raw ADC reading above which a sample counts toward a ring
    pub analog_threshold: u16,
    /// Above-threshold samples needed inside one window to declare ringing
    pub ring_count_threshold: u32,
    /// Length of the counting window
    pub ring_count_period_ms: u64,
    /// Control loop cadence; one sensor sample per iteration
    pub sample_interval_ms: u64,
}

impl Default for DoorbellSettings {
    fn default() -> Self {
        Self {
            analog_threshold: 200,
            ring_count_threshold: 10,
            ring_count_period_ms: 500,
            sample_interval_ms: 5,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [relay]
// ─────────────────────────────────────────────────────────────────────────────

/// Unlock duration policy
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelaySettings {
    pub default_unlock_seconds: u64,
    /// Requests above this are clamped
    pub max_unlock_seconds: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            default_unlock_seconds: doorlink_core::DEFAULT_UNLOCK_SECONDS,
            max_unlock_seconds: 30,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [hardware]
// ─────────────────────────────────────────────────────────────────────────────

/// Which I/O backend drives the relay and samples the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareBackend {
    /// Log relay transitions, report an idle sensor
    #[default]
    Simulated,
    /// Linux GPIO value file + IIO raw ADC file
    Sysfs,
}

/// Pin/file assignments
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct HardwareSettings {
    pub backend: HardwareBackend,
    pub relay_value_path: PathBuf,
    pub sensor_value_path: PathBuf,
    /// Relay energizes when the output is driven high
    pub relay_active_high: bool,
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            backend: HardwareBackend::default(),
            relay_value_path: PathBuf::from("/sys/class/gpio/gpio16/value"),
            sensor_value_path: PathBuf::from("/sys/bus/iio/devices/iio:device0/in_voltage0_raw"),
            relay_active_high: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [logging]
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log directory; platform data dir when unset
    pub directory: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_installed_hardware() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 443);
        assert_eq!(settings.server.path, "/ws/device");
        assert_eq!(settings.channel.reconnect_interval_ms, 5_000);
        assert_eq!(settings.channel.heartbeat_interval_ms, 15_000);
        assert_eq!(settings.channel.heartbeat_timeout_ms, 3_000);
        assert_eq!(settings.channel.heartbeat_max_missed, 2);
        assert_eq!(settings.doorbell.analog_threshold, 200);
        assert_eq!(settings.doorbell.ring_count_threshold, 10);
        assert_eq!(settings.doorbell.ring_count_period_ms, 500);
        assert_eq!(settings.relay.default_unlock_seconds, 5);
        assert_eq!(settings.hardware.backend, HardwareBackend::Simulated);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_url_uses_scheme_from_tls_flag() {
        let mut server = ServerSettings {
            host: "door.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(server.url(), "wss://door.example.com:443/ws/device");

        server.tls = false;
        server.port = 8080;
        assert_eq!(server.url(), "ws://door.example.com:8080/ws/device");
    }

    #[test]
    fn test_channel_config_carries_timing() {
        let mut settings = Settings::default();
        settings.channel.reconnect_interval_ms = 1_000;
        let config = settings.channel_config().unwrap();
        assert_eq!(config.reconnect_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(3));
        assert_eq!(config.username, "device");
    }

    #[test]
    fn test_validate_rejects_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(matches!(
            settings.validate(),
            Err(Error::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        let mut settings = Settings::default();
        settings.server.path = "ws/device".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_default_above_max() {
        let mut settings = Settings::default();
        settings.relay.default_unlock_seconds = 45;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_ring_threshold() {
        let mut settings = Settings::default();
        settings.doorbell.ring_count_threshold = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_server_debug_redacts_password() {
        let server = ServerSettings {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        assert!(!format!("{:?}", server).contains("hunter2"));
    }

    #[test]
    fn test_backend_parses_lowercase() {
        let hw: HardwareSettings = toml::from_str("backend = \"sysfs\"").unwrap();
        assert_eq!(hw.backend, HardwareBackend::Sysfs);
    }
}
