//! Control channel endpoint, credentials and timing

use std::time::Duration;

use url::Url;

use doorlink_core::prelude::*;

/// Delay between reconnection attempts. Fixed, no backoff.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Interval between liveness pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// How long a ping may go unanswered before it counts as missed.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(3);

/// Consecutive missed pings that tear the connection down.
pub const DEFAULT_HEARTBEAT_MAX_MISSED: u32 = 2;

/// Everything the background task needs to reach the server.
#[derive(Clone)]
pub struct ChannelConfig {
    pub url: Url,
    pub username: String,
    pub password: String,
    pub reconnect_interval: Duration,
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub heartbeat_max_missed: u32,
}

impl ChannelConfig {
    /// Create a config for `url` with default timing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigInvalid`] if `url` does not parse or its scheme
    /// is not `ws` or `wss`.
    pub fn new(
        url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::config_invalid(format!("control channel url '{url}': {e}")))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::config_invalid(format!(
                    "control channel url must use ws or wss, got '{other}'"
                )))
            }
        }
        Ok(Self {
            url,
            username: username.into(),
            password: password.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            heartbeat_max_missed: DEFAULT_HEARTBEAT_MAX_MISSED,
        })
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_heartbeat(mut self, interval: Duration, timeout: Duration, max_missed: u32) -> Self {
        self.heartbeat_interval = interval;
        self.heartbeat_timeout = timeout;
        self.heartbeat_max_missed = max_missed;
        self
    }

    /// `true` when the endpoint requires TLS (`wss://`).
    pub fn is_tls(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl std::fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("reconnect_interval", &self.reconnect_interval)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("heartbeat_timeout", &self.heartbeat_timeout)
            .field("heartbeat_max_missed", &self.heartbeat_max_missed)
            .finish()
    }
}
