//! # doorlink-channel - Control Channel
//!
//! Maintains the single persistent WebSocket connection to the control
//! server: HTTP Basic authentication, TLS, a ping/pong liveness check and
//! fixed-interval reconnection that never gives up.
//!
//! Depends on [`doorlink_core`] for error handling.
//!
//! ## Public API
//!
//! - [`ChannelClient`] - Spawn the background connection task, send text frames,
//!   drain [`ChannelEvent`]s
//! - [`ChannelConfig`] - Endpoint, credentials and timing
//! - [`ChannelEvent`] / [`Frame`] - Lifecycle notifications and received frames
//! - [`ConnectionState`] - Diagnostic view of the connection

pub mod client;
pub mod config;
pub mod event;
mod heartbeat;

pub use client::ChannelClient;
pub use config::{
    ChannelConfig, DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HEARTBEAT_MAX_MISSED,
    DEFAULT_HEARTBEAT_TIMEOUT, DEFAULT_RECONNECT_INTERVAL,
};
pub use event::{ChannelEvent, ConnectionState, Frame};
