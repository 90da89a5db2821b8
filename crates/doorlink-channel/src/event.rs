//! Notifications delivered from the control channel to the layer above

/// A frame received from the server. Contents are not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Lifecycle and data notifications, delivered strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A connection was established and authenticated.
    ///
    /// `connection_id` starts at 1 and increases by one on every connect.
    Connected { url: String, connection_id: u64 },
    /// The connection was lost or closed; reconnection follows unless shut down
    Disconnected { reason: String },
    /// A data frame arrived
    Frame(Frame),
}

/// Current connection state of a [`ChannelClient`](crate::ChannelClient).
///
/// For diagnostics only. Consumers learn about transitions from
/// [`ChannelEvent`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; either waiting to retry or shut down.
    Disconnected,
    /// Initial connection attempt in progress.
    Connecting,
    /// Connected and exchanging frames.
    Connected,
    /// Connection lost; background task is retrying.
    Reconnecting {
        /// The current reconnection attempt number (1-indexed).
        attempt: u32,
    },
}
