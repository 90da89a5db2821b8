//! Configuration file parsing for doorlink
//!
//! One TOML file, loaded once at startup. Every field has a default, so a
//! partial file (or no file at all) is valid.

pub mod settings;
pub mod types;

pub use settings::{init_config_file, load_settings, DEFAULT_CONFIG_FILENAME};
pub use types::*;
