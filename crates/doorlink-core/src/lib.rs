//! # doorlink-core - Core Domain Types
//!
//! Foundation crate for doorlink. Provides the error type, logging setup and
//! the wire-level message types exchanged with the control server.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Messages (`messages`)
//! - [`Command`] - A decoded inbound instruction (currently only unlock)
//! - [`StatusEvent`] - An outbound status announcement
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with a `fatal` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use doorlink_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod messages;
pub mod prelude;

pub use error::{Error, Result};
pub use messages::{
    Command, CommandKind, StatusEvent, DEFAULT_UNLOCK_SECONDS, DEVICE_COMMAND_TYPE,
    DEVICE_STATUS_TYPE,
};
