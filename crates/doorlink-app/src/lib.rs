//! # doorlink-app - Device Control Loop
//!
//! Ties the control channel to the door hardware.
//!
//! ## Public API
//!
//! ### Configuration (`config`)
//! - [`Settings`] - The whole device configuration
//! - [`load_settings`] / [`init_config_file`] - TOML file handling
//!
//! ### Control loop (`engine`)
//! - [`Engine`] - Owns all device state; [`Engine::run_until`] drives it
//! - [`ControlChannelState`] - Connection state as seen by the loop
//!
//! ### Components
//! - [`RingDetector`] - Doorbell debounce state machine
//! - [`Actuator`] - Timed relay activation
//! - [`decode_command`] - Inbound frame decoding
//! - [`hal`] - Relay, sensor and clock traits with their backends

pub mod actuator;
pub mod config;
pub mod detector;
pub mod engine;
pub mod hal;
pub mod protocol;
pub mod signals;
pub mod transport;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use actuator::Actuator;
pub use config::{init_config_file, load_settings, Settings, DEFAULT_CONFIG_FILENAME};
pub use detector::{RingDetector, RingDetectorConfig, RingDetectorState, RingEdge};
pub use engine::{ControlChannelState, Engine};
pub use hal::{Clock, Hardware, RelayOutput, RelayState, RingSensor, SystemClock};
pub use protocol::{decode_command, Decoded, Rejection, UnlockPolicy};
pub use transport::Transport;

use doorlink_channel::ChannelClient;
use doorlink_core::prelude::*;

/// Start the control channel and run the control loop until a shutdown
/// signal or a fatal hardware error.
pub async fn run(settings: Settings) -> Result<()> {
    let channel_config = settings.channel_config()?;
    debug!("Channel configuration: {:?}", channel_config);

    let hardware = Hardware::from_settings(&settings.hardware);
    let channel = ChannelClient::spawn(channel_config);

    let mut engine = Engine::new(Box::new(channel), hardware, &settings);
    engine.run_until(signals::shutdown_signal()).await
}
