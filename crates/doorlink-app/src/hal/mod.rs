//! Hardware abstraction
//!
//! The control loop only sees these traits. Concrete backends:
//! - [`sysfs`] - Linux GPIO value file + IIO raw ADC file
//! - [`simulated`] - logs relay transitions, reports an idle sensor
//! - [`embedded`] - adapter for any `embedded-hal` output pin

pub mod embedded;
pub mod simulated;
pub mod sysfs;

use doorlink_core::prelude::*;
use tokio::time::Instant;

use crate::config::{HardwareBackend, HardwareSettings};

pub use embedded::EmbeddedHalRelay;
pub use simulated::{SimulatedRelay, SimulatedSensor};
pub use sysfs::{SysfsRelay, SysfsSensor};

/// Digital output driving the door-strike relay
pub trait RelayOutput: Send {
    /// Drive the relay coil. `true` energizes (unlocks).
    fn set_energized(&mut self, energized: bool) -> Result<()>;
}

/// Analog doorbell sensor
pub trait RingSensor: Send {
    /// One raw ADC reading
    fn read(&mut self) -> Result<u16>;
}

/// Time source for the control loop
pub trait Clock: Send {
    /// Milliseconds since the clock was created
    fn monotonic_ms(&self) -> u64;

    /// Wall-clock seconds since the Unix epoch
    fn epoch_seconds(&self) -> i64;
}

/// Relay output level as last commanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    Energized,
    #[default]
    DeEnergized,
}

impl RelayState {
    pub fn is_energized(&self) -> bool {
        matches!(self, RelayState::Energized)
    }
}

/// Monotonic time from the tokio clock, wall time from the system clock
#[derive(Debug, Clone)]
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic_ms(&self) -> u64 {
        u64::try_from(self.boot.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn epoch_seconds(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// The device's I/O, owned by the control loop
pub struct Hardware {
    pub relay: Box<dyn RelayOutput>,
    pub sensor: Box<dyn RingSensor>,
    pub clock: Box<dyn Clock>,
}

impl Hardware {
    /// Build the backend selected in `[hardware]`
    pub fn from_settings(settings: &HardwareSettings) -> Self {
        let (relay, sensor): (Box<dyn RelayOutput>, Box<dyn RingSensor>) = match settings.backend {
            HardwareBackend::Simulated => {
                info!("Using simulated hardware backend");
                (Box::new(SimulatedRelay::new()), Box::new(SimulatedSensor))
            }
            HardwareBackend::Sysfs => {
                info!(
                    "Using sysfs hardware backend (relay: {}, sensor: {})",
                    settings.relay_value_path.display(),
                    settings.sensor_value_path.display()
                );
                (
                    Box::new(SysfsRelay::new(
                        settings.relay_value_path.clone(),
                        settings.relay_active_high,
                    )),
                    Box::new(SysfsSensor::new(settings.sensor_value_path.clone())),
                )
            }
        };

        Self {
            relay,
            sensor,
            clock: Box::new(SystemClock::new()),
        }
    }
}

impl std::fmt::Debug for Hardware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hardware").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_is_monotonic_ms() {
        let clock = SystemClock::new();
        assert_eq!(clock.monotonic_ms(), 0);
        tokio::time::advance(Duration::from_millis(1_250)).await;
        assert_eq!(clock.monotonic_ms(), 1_250);
    }

    #[test]
    fn test_system_clock_epoch_is_recent() {
        let clock = SystemClock::new();
        // 2020-01-01T00:00:00Z
        assert!(clock.epoch_seconds() > 1_577_836_800);
    }

    #[test]
    fn test_relay_state_defaults_to_safe() {
        assert_eq!(RelayState::default(), RelayState::DeEnergized);
        assert!(!RelayState::default().is_energized());
    }

    #[test]
    fn test_simulated_backend_reads_idle() {
        let mut hw = Hardware::from_settings(&HardwareSettings::default());
        assert_eq!(hw.sensor.read().unwrap(), 0);
        assert!(hw.relay.set_energized(true).is_ok());
    }
}
