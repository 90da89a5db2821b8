//! Linux sysfs backend
//!
//! The relay is a GPIO exported under `/sys/class/gpio` (direction already
//! set to `out`); the doorbell sensor is an IIO ADC channel's raw value file.

use std::path::PathBuf;

use doorlink_core::prelude::*;

use super::{RelayOutput, RingSensor};

/// Relay on a sysfs GPIO `value` file
#[derive(Debug)]
pub struct SysfsRelay {
    path: PathBuf,
    active_high: bool,
}

impl SysfsRelay {
    pub fn new(path: PathBuf, active_high: bool) -> Self {
        Self { path, active_high }
    }

    fn level(&self, energized: bool) -> &'static str {
        if energized == self.active_high {
            "1"
        } else {
            "0"
        }
    }
}

impl RelayOutput for SysfsRelay {
    fn set_energized(&mut self, energized: bool) -> Result<()> {
        std::fs::write(&self.path, self.level(energized))
            .map_err(|e| Error::hardware(self.path.display().to_string(), e.to_string()))
    }
}

/// Doorbell sensor on an IIO `in_voltageN_raw` file
#[derive(Debug)]
pub struct SysfsSensor {
    path: PathBuf,
}

impl SysfsSensor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RingSensor for SysfsSensor {
    fn read(&mut self) -> Result<u16> {
        let device = || self.path.display().to_string();
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::hardware(device(), e.to_string()))?;
        raw.trim()
            .parse::<u16>()
            .map_err(|e| Error::hardware(device(), format!("bad reading {:?}: {}", raw.trim(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_relay_active_high_writes_one_when_energized() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("value");
        let mut relay = SysfsRelay::new(path.clone(), true);

        relay.set_energized(true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1");
        relay.set_energized(false).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
    }

    #[test]
    fn test_relay_active_low_inverts() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("value");
        let mut relay = SysfsRelay::new(path.clone(), false);

        relay.set_energized(true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
    }

    #[test]
    fn test_relay_missing_gpio_is_hardware_fault() {
        let temp = tempdir().unwrap();
        let mut relay = SysfsRelay::new(temp.path().join("gpio99").join("value"), true);

        let err = relay.set_energized(true).unwrap_err();
        assert!(matches!(err, Error::Hardware { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_sensor_parses_trimmed_reading() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("in_voltage0_raw");
        std::fs::write(&path, "742\n").unwrap();

        let mut sensor = SysfsSensor::new(path);
        assert_eq!(sensor.read().unwrap(), 742);
    }

    #[test]
    fn test_sensor_garbage_is_hardware_fault() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("in_voltage0_raw");
        std::fs::write(&path, "n/a\n").unwrap();

        let mut sensor = SysfsSensor::new(path);
        assert!(matches!(sensor.read(), Err(Error::Hardware { .. })));
    }
}
