//! Relay adapter for `embedded-hal` output pins
//!
//! Lets a board-support crate's GPIO type drive the relay without a
//! dedicated backend.
//!
//! Library API only: `[hardware] backend` cannot select it, since a pin type
//! is not something a config file can name. Build the relay in your own
//! binary and hand it to [`Engine::new`](crate::Engine::new) inside a
//! [`Hardware`](super::Hardware).

use embedded_hal::digital::{Error as _, OutputPin};

use doorlink_core::prelude::*;

use super::RelayOutput;

/// Drives the relay through any [`OutputPin`]
#[derive(Debug)]
pub struct EmbeddedHalRelay<P> {
    pin: P,
    active_high: bool,
}

impl<P: OutputPin> EmbeddedHalRelay<P> {
    pub fn new(pin: P, active_high: bool) -> Self {
        Self { pin, active_high }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin + Send> RelayOutput for EmbeddedHalRelay<P> {
    fn set_energized(&mut self, energized: bool) -> Result<()> {
        let result = if energized == self.active_high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|e| Error::hardware("relay pin", format!("{:?}", e.kind())))
    }
}
