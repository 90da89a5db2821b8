//! Bench backend with no physical I/O.

use doorlink_core::prelude::*;

use super::{RelayOutput, RingSensor};

#[derive(Debug, Default)]
pub struct SimulatedRelay {
    energized: bool,
}

impl SimulatedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }
}

impl RelayOutput for SimulatedRelay {
    fn set_energized(&mut self, energized: bool) -> Result<()> {
        if energized != self.energized {
            info!(
                "[simulated] relay {}",
                if energized { "energized" } else { "de-energized" }
            );
        }
        self.energized = energized;
        Ok(())
    }
}

/// Always reads 0: the doorbell never rings.
#[derive(Debug, Default)]
pub struct SimulatedSensor;

impl RingSensor for SimulatedSensor {
    fn read(&mut self) -> Result<u16> {
        Ok(0)
    }
}
