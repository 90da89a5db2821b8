//! The control loop's view of the control channel.

use doorlink_channel::{ChannelClient, ChannelEvent};

/// Non-blocking event source and frame sink.
pub trait Transport: Send {
    /// Next pending event, if one has arrived
    fn try_next_event(&mut self) -> Option<ChannelEvent>;

    /// Send a text frame on connection `connection_id`, as announced by
    /// [`ChannelEvent::Connected`]. Returns `false` if it was dropped, which
    /// includes `connection_id` no longer being the live connection.
    fn send_text(&mut self, connection_id: u64, text: String) -> bool;

    /// Stop the channel and close any open connection
    fn close(&mut self);
}

impl Transport for ChannelClient {
    fn try_next_event(&mut self) -> Option<ChannelEvent> {
        ChannelClient::try_next_event(self)
    }

    fn send_text(&mut self, connection_id: u64, text: String) -> bool {
        ChannelClient::send_text(self, connection_id, text)
    }

    fn close(&mut self) {
        self.shutdown();
    }
}
