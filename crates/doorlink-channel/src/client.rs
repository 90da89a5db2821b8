//! Async WebSocket client for the device control channel.
//!
//! The [`ChannelClient`] owns one background Tokio task that connects to the
//! control server, keeps the connection alive with ping/pong, and
//! reconnects on a fixed interval whenever the connection is lost. The task
//! reports lifecycle changes and received frames through an mpsc channel that
//! the control loop drains once per iteration.
//!
//! Every established connection gets a new id, carried by
//! [`ChannelEvent::Connected`]. Outbound frames name the connection they were
//! produced for and are dropped if that connection is no longer the live one.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ChannelClient                          │
//! │                                                               │
//! │  ┌───────────────┐        ┌──────────────────────────────┐   │
//! │  │  Public API   │        │   Background Task             │   │
//! │  │               │        │                                │   │
//! │  │  send_text() ─┼──cmd──▶│  connect ─▶ read/write loop   │   │
//! │  │               │  chan  │     ▲        │ heartbeat       │   │
//! │  │  try_next_  ◀─┼──evt──◀│     └─ wait ◀┘ (5s, forever)   │   │
//! │  │  event()      │  chan  │                                │   │
//! │  └───────────────┘        └──────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use doorlink_core::prelude::*;

use crate::config::ChannelConfig;
use crate::event::{ChannelEvent, ConnectionState, Frame};
use crate::heartbeat::{Heartbeat, PingOutcome};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Capacity of the command channel (bounded, to apply backpressure).
const CMD_CHANNEL_CAPACITY: usize = 32;

/// Capacity of the event channel. The control loop may be parked in a door
/// hold for several seconds, so this is sized to absorb a burst.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on a single connection attempt (TCP + TLS + upgrade).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Internal types
// ---------------------------------------------------------------------------

/// Internal messages sent from the public API to the background task.
#[derive(Debug)]
enum ClientCommand {
    /// Write a text frame, if `connection_id` is still the live connection.
    SendText { connection_id: u64, text: String },
    /// Close the connection gracefully and stop the background task.
    Shutdown,
}

/// Why a connection's I/O loop returned.
#[derive(Debug)]
enum IoOutcome {
    /// Shutdown requested (or the client was dropped); do not reconnect.
    Shutdown,
    /// Connection lost; reconnect after the interval.
    Lost(String),
}

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// State shared between the handle and the background task.
#[derive(Debug)]
struct Link {
    state: ConnectionState,
    /// Id of the live connection; `None` unless `state` is `Connected`.
    connection_id: Option<u64>,
}

type SharedState = Arc<std::sync::RwLock<Link>>;

// ---------------------------------------------------------------------------
// ChannelClient
// ---------------------------------------------------------------------------

/// Handle to the control channel.
///
/// Create with [`ChannelClient::spawn`]. The background task runs until
/// [`ChannelClient::shutdown`] is called or the client is dropped (the command
/// channel closes, which signals the task to exit).
pub struct ChannelClient {
    cmd_tx: mpsc::Sender<ClientCommand>,
    event_rx: mpsc::Receiver<ChannelEvent>,
    state: SharedState,
}

impl std::fmt::Debug for ChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelClient")
            .field("connection_state", &self.connection_state())
            .finish()
    }
}

impl ChannelClient {
    /// Start the background connection task and return immediately.
    ///
    /// Never fails: an unreachable server is retried every
    /// `config.reconnect_interval`, indefinitely, including the very first
    /// attempt. Must be called from within a Tokio runtime.
    pub fn spawn(config: ChannelConfig) -> Self {
        if config.is_tls() {
            // Already-installed is fine: another component picked the same provider.
            let _ = rustls::crypto::ring::default_provider().install_default();
        }

        let (cmd_tx, cmd_rx) = mpsc::channel::<ClientCommand>(CMD_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<ChannelEvent>(EVENT_CHANNEL_CAPACITY);
        let state = Arc::new(std::sync::RwLock::new(Link {
            state: ConnectionState::Connecting,
            connection_id: None,
        }));

        info!("Control channel: starting for {}", config.url);
        tokio::spawn(run_client_task(config, cmd_rx, event_tx, Arc::clone(&state)));

        Self {
            cmd_tx,
            event_rx,
            state,
        }
    }

    /// Queue a text frame for connection `connection_id`.
    ///
    /// Returns `false` when the frame was dropped: `connection_id` is not the
    /// live connection, or the outbound queue is full. A frame that is queued
    /// but finds a newer connection when it reaches the socket is dropped as
    /// well. Frames are never carried over to a later connection.
    pub fn send_text(&self, connection_id: u64, text: impl Into<String>) -> bool {
        match self.current_connection() {
            Some(live) if live == connection_id => {}
            Some(live) => {
                debug!(
                    "Control channel: frame for connection {} dropped, live connection is {}",
                    connection_id, live
                );
                return false;
            }
            None => {
                debug!("Control channel: not connected, dropping outbound frame");
                return false;
            }
        }
        let cmd = ClientCommand::SendText {
            connection_id,
            text: text.into(),
        };
        match self.cmd_tx.try_send(cmd) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Control channel: outbound queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Control channel: task has exited, dropping frame");
                false
            }
        }
    }

    /// Take the next pending event without waiting.
    pub fn try_next_event(&mut self) -> Option<ChannelEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Return the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).state.clone()
    }

    /// Return `true` if the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.current_connection().is_some()
    }

    /// Id of the live connection, if any.
    pub fn current_connection(&self) -> Option<u64> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).connection_id
    }

    /// Ask the background task to close the connection and exit.
    ///
    /// Returns immediately. Dropping the client has the same effect.
    pub fn shutdown(&self) {
        // Full queue or exited task: the task will still see the channel close
        // when the client is dropped.
        let _ = self.cmd_tx.try_send(ClientCommand::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// Background task
// ---------------------------------------------------------------------------

/// Entry point for the background WebSocket I/O task.
///
/// Connect, run the I/O loop until the connection drops, wait the reconnect
/// interval, repeat. Exits only on shutdown.
async fn run_client_task(
    config: ChannelConfig,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
    event_tx: mpsc::Sender<ChannelEvent>,
    state: SharedState,
) {
    let url = config.url.to_string();
    let mut attempt: u32 = 0;
    let mut last_connection_id: u64 = 0;

    loop {
        set_state(
            &state,
            if attempt == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting { attempt }
            },
        );

        let connected = tokio::select! {
            result = connect_ws(&config) => Some(result),
            _ = wait_for_shutdown(&mut cmd_rx) => None,
        };

        match connected {
            None => break,
            Some(Ok(ws_stream)) => {
                if attempt > 0 {
                    info!("Control channel: reconnected (attempt {})", attempt);
                }
                attempt = 0;

                if !discard_stale_commands(&mut cmd_rx) {
                    break;
                }
                last_connection_id += 1;
                let connection_id = last_connection_id;
                set_connected(&state, connection_id);
                info!(
                    "Control channel: connected to {} (connection {})",
                    url, connection_id
                );
                let event = ChannelEvent::Connected {
                    url: url.clone(),
                    connection_id,
                };
                if event_tx.send(event).await.is_err() {
                    break;
                }

                let outcome =
                    run_io_loop(ws_stream, connection_id, &mut cmd_rx, &event_tx, &config).await;
                set_state(&state, ConnectionState::Disconnected);

                match outcome {
                    IoOutcome::Shutdown => {
                        let _ = event_tx.try_send(ChannelEvent::Disconnected {
                            reason: "shutdown".to_string(),
                        });
                        break;
                    }
                    IoOutcome::Lost(reason) => {
                        warn!("Control channel: connection lost: {}", reason);
                        if event_tx
                            .send(ChannelEvent::Disconnected { reason })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
            Some(Err(err)) => {
                warn!(
                    "Control channel: connection attempt {} failed: {}",
                    attempt + 1,
                    err
                );
            }
        }

        attempt = attempt.saturating_add(1);
        debug!(
            "Control channel: retrying in {:?} (attempt {})",
            config.reconnect_interval, attempt
        );
        if !wait_reconnect_interval(config.reconnect_interval, &mut cmd_rx).await {
            break;
        }
    }

    set_state(&state, ConnectionState::Disconnected);
    debug!("Control channel background task exiting");
}

/// Run one connection's read/write select loop.
async fn run_io_loop(
    ws_stream: WsStream,
    connection_id: u64,
    cmd_rx: &mut mpsc::Receiver<ClientCommand>,
    event_tx: &mpsc::Sender<ChannelEvent>,
    config: &ChannelConfig,
) -> IoOutcome {
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let mut heartbeat = Heartbeat::new(config.heartbeat_timeout, config.heartbeat_max_missed);
    let mut ping_interval = tokio::time::interval(config.heartbeat_interval);
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping_interval.tick().await; // consume the immediate first tick

    loop {
        let ping_deadline = heartbeat.deadline();

        tokio::select! {
            // ── Incoming WebSocket message ───────────────────────────────
            frame = ws_stream.next() => {
                let event = match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        ChannelEvent::Frame(Frame::Text(text.as_str().to_owned()))
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        ChannelEvent::Frame(Frame::Binary(bytes.to_vec()))
                    }
                    Some(Ok(WsMessage::Pong(_))) => {
                        trace!("Control channel: pong");
                        heartbeat.pong_received();
                        continue;
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let reason = frame
                            .map(|f| {
                                format!(
                                    "server closed connection ({}: {})",
                                    u16::from(f.code),
                                    f.reason.as_str()
                                )
                            })
                            .unwrap_or_else(|| "server closed connection".to_string());
                        return IoOutcome::Lost(reason);
                    }
                    Some(Ok(_)) => {
                        // Ping (answered by tungstenite) or raw frame
                        continue;
                    }
                    Some(Err(err)) => {
                        return IoOutcome::Lost(format!("read error: {err}"));
                    }
                    None => {
                        return IoOutcome::Lost("stream ended".to_string());
                    }
                };
                if event_tx.send(event).await.is_err() {
                    send_close(&mut ws_sink).await;
                    return IoOutcome::Shutdown;
                }
            }

            // ── Outgoing command from the public API ─────────────────────
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::SendText { connection_id: target, .. })
                        if target != connection_id =>
                    {
                        debug!(
                            "Control channel: frame for connection {} dropped on connection {}",
                            target, connection_id
                        );
                    }
                    Some(ClientCommand::SendText { text, .. }) => {
                        trace!("Control channel: sending {}", text);
                        if let Err(err) = ws_sink.send(WsMessage::Text(text.into())).await {
                            return IoOutcome::Lost(format!("write error: {err}"));
                        }
                    }
                    Some(ClientCommand::Shutdown) | None => {
                        debug!("Control channel: shutting down connection");
                        send_close(&mut ws_sink).await;
                        return IoOutcome::Shutdown;
                    }
                }
            }

            // ── Liveness ping ───────────────────────────────────────────
            _ = ping_interval.tick() => {
                if let Err(err) = ws_sink.send(WsMessage::Ping(Vec::new().into())).await {
                    return IoOutcome::Lost(format!("ping failed: {err}"));
                }
                heartbeat.ping_sent(Instant::now());
            }

            _ = tokio::time::sleep_until(ping_deadline.unwrap_or_else(Instant::now)),
                if ping_deadline.is_some() =>
            {
                match heartbeat.expire(Instant::now()) {
                    PingOutcome::Dead => {
                        send_close(&mut ws_sink).await;
                        return IoOutcome::Lost("heartbeat timeout".to_string());
                    }
                    PingOutcome::Missed { consecutive } => {
                        warn!(
                            "Control channel: no pong within {:?} ({} missed)",
                            config.heartbeat_timeout, consecutive
                        );
                    }
                    PingOutcome::Pending => {}
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn set_state(state: &SharedState, next: ConnectionState) {
    let mut guard = state.write().unwrap_or_else(|e| e.into_inner());
    guard.state = next;
    guard.connection_id = None;
}

fn set_connected(state: &SharedState, connection_id: u64) {
    let mut guard = state.write().unwrap_or_else(|e| e.into_inner());
    guard.state = ConnectionState::Connected;
    guard.connection_id = Some(connection_id);
}

/// Build the upgrade request with the HTTP Basic `Authorization` header.
fn build_request(config: &ChannelConfig) -> Result<Request> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| Error::channel(format!("invalid request for {}: {e}", config.url)))?;

    let credentials = BASE64_STANDARD.encode(format!("{}:{}", config.username, config.password));
    let value = HeaderValue::from_str(&format!("Basic {credentials}"))
        .map_err(|e| Error::channel(format!("invalid authorization header: {e}")))?;
    request.headers_mut().insert(AUTHORIZATION, value);

    Ok(request)
}

/// Establish a new authenticated WebSocket connection.
async fn connect_ws(config: &ChannelConfig) -> Result<WsStream> {
    let request = build_request(config)?;
    let (ws_stream, _response) = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(request))
        .await
        .map_err(|_| Error::channel(format!("connect timed out after {:?}", CONNECT_TIMEOUT)))?
        .map_err(|err| Error::channel(format!("failed to connect: {err}")))?;
    Ok(ws_stream)
}

/// Resolve once shutdown is requested, dropping any frames queued meanwhile.
///
/// Cancel-safe: used as a `select!` arm alongside connection attempts.
async fn wait_for_shutdown(cmd_rx: &mut mpsc::Receiver<ClientCommand>) {
    loop {
        match cmd_rx.recv().await {
            Some(ClientCommand::SendText { .. }) => {
                debug!("Control channel: not connected, dropping outbound frame");
            }
            Some(ClientCommand::Shutdown) | None => return,
        }
    }
}

/// Sleep for the reconnect interval. Returns `false` if shutdown was
/// requested in the meantime.
async fn wait_reconnect_interval(
    interval: Duration,
    cmd_rx: &mut mpsc::Receiver<ClientCommand>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => true,
        _ = wait_for_shutdown(cmd_rx) => false,
    }
}

/// Drop frames queued against a previous connection.
///
/// Returns `false` if a shutdown request was among them.
fn discard_stale_commands(cmd_rx: &mut mpsc::Receiver<ClientCommand>) -> bool {
    let mut dropped = 0usize;
    while let Ok(cmd) = cmd_rx.try_recv() {
        match cmd {
            ClientCommand::SendText { .. } => dropped += 1,
            ClientCommand::Shutdown => return false,
        }
    }
    if dropped > 0 {
        debug!(
            "Control channel: discarded {} frame(s) queued before reconnect",
            dropped
        );
    }
    true
}

/// Send a WebSocket Close frame, ignoring any write errors.
async fn send_close(ws_sink: &mut SplitSink<WsStream, WsMessage>) {
    let _ = ws_sink.send(WsMessage::Close(None)).await;
    let _ = ws_sink.close().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ChannelConfig {
        ChannelConfig::new(url, "device", "s3cret").unwrap()
    }

    #[test]
    fn test_build_request_sets_basic_auth() {
        let request = build_request(&config("ws://127.0.0.1:9000/ws/device")).unwrap();
        let header = request.headers().get(AUTHORIZATION).unwrap();
        let expected = format!("Basic {}", BASE64_STANDARD.encode("device:s3cret"));
        assert_eq!(header.to_str().unwrap(), expected);
        assert_eq!(request.uri().path(), "/ws/device");
    }

    #[test]
    fn test_build_request_keeps_port() {
        let request = build_request(&config("wss://door.example.com:8443/ws/device")).unwrap();
        assert_eq!(request.uri().port_u16(), Some(8443));
        assert_eq!(request.uri().scheme_str(), Some("wss"));
    }

    fn text(connection_id: u64, text: &str) -> ClientCommand {
        ClientCommand::SendText {
            connection_id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_discard_stale_commands_drops_text() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(text(1, "a")).await.unwrap();
        tx.send(text(1, "b")).await.unwrap();
        assert!(discard_stale_commands(&mut rx));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_discard_stale_commands_honours_shutdown() {
        let (tx, mut rx) = mpsc::channel(4);
        tx.send(text(1, "a")).await.unwrap();
        tx.send(ClientCommand::Shutdown).await.unwrap();
        assert!(!discard_stale_commands(&mut rx));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reconnect_interval_elapses() {
        let (_tx, mut rx) = mpsc::channel::<ClientCommand>(4);
        assert!(wait_reconnect_interval(Duration::from_secs(5), &mut rx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reconnect_interval_interrupted_by_shutdown() {
        let (tx, mut rx) = mpsc::channel::<ClientCommand>(4);
        tx.send(text(1, "dropped")).await.unwrap();
        tx.send(ClientCommand::Shutdown).await.unwrap();
        assert!(!wait_reconnect_interval(Duration::from_secs(5), &mut rx).await);
    }

    #[tokio::test]
    async fn test_send_text_dropped_while_not_connected() {
        // Port 1 refuses connections; the client never reaches Connected.
        let client = ChannelClient::spawn(config("ws://127.0.0.1:1/ws/device"));
        assert!(!client.is_connected());
        assert_eq!(client.current_connection(), None);
        assert!(!client.send_text(1, "{}"));
        client.shutdown();
    }

    #[test]
    fn test_connection_id_cleared_when_not_connected() {
        let state: SharedState = Arc::new(std::sync::RwLock::new(Link {
            state: ConnectionState::Connecting,
            connection_id: None,
        }));
        set_connected(&state, 3);
        assert_eq!(state.read().unwrap().connection_id, Some(3));
        assert_eq!(state.read().unwrap().state, ConnectionState::Connected);

        set_state(&state, ConnectionState::Disconnected);
        assert_eq!(state.read().unwrap().connection_id, None);
    }

    #[test]
    fn test_client_is_debug() {
        fn assert_debug<T: std::fmt::Debug>() {}
        assert_debug::<ChannelClient>();
    }
}
