//! Settings loader for doorlink.toml

use std::path::Path;

use doorlink_core::prelude::*;

use super::types::Settings;

/// Default configuration file name, relative to the working directory
pub const DEFAULT_CONFIG_FILENAME: &str = "doorlink.toml";

const DEFAULT_CONFIG_CONTENT: &str = r#"# doorlink device configuration

[server]
host = "localhost"
port = 443
path = "/ws/device"
tls = true              # false = plain ws:// (bench testing only)
username = "device"
password = ""

[channel]
reconnect_interval_ms = 5000
heartbeat_interval_ms = 15000
heartbeat_timeout_ms = 3000
heartbeat_max_missed = 2    # consecutive unanswered pings before reconnecting

[doorbell]
analog_threshold = 200      # raw ADC units
ring_count_threshold = 10   # samples above threshold within one window
ring_count_period_ms = 500
sample_interval_ms = 5

[relay]
default_unlock_seconds = 5
max_unlock_seconds = 30     # longer requests are clamped

[hardware]
backend = "simulated"       # "simulated" or "sysfs"
relay_value_path = "/sys/class/gpio/gpio16/value"
sensor_value_path = "/sys/bus/iio/devices/iio:device0/in_voltage0_raw"
relay_active_high = true

[logging]
# directory = "/var/log/doorlink"
"#;

/// Load and validate settings from `path`.
///
/// A missing file yields defaults. A file that exists but cannot be read,
/// parsed or validated is an error: credentials must never silently fall back.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        let settings = Settings::default();
        settings.validate()?;
        return Ok(settings);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config_invalid(format!("Failed to read {}: {}", path.display(), e)))?;

    let settings: Settings = toml::from_str(&content)
        .map_err(|e| Error::config_invalid(format!("Failed to parse {}: {}", path.display(), e)))?;

    settings.validate()?;
    debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Write a commented default configuration to `path`.
///
/// Refuses to overwrite an existing file.
pub fn init_config_file(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::config(format!(
            "{} already exists, not overwriting",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::config(format!("Failed to create {}: {}", parent.display(), e)))?;
    }

    std::fs::write(path, DEFAULT_CONFIG_CONTENT)
        .map_err(|e| Error::config(format!("Failed to write {}: {}", path.display(), e)))?;

    info!("Wrote default configuration to {}", path.display());
    Ok(())
}
