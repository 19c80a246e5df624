//! Connection lifecycle state machine.
//!
//! Uses the action pattern: methods take time as input and return
//! [`ConnectionAction`]s for the driver to execute. The state machine never
//! touches the transport, so it can be exercised without a broker.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  begin   ┌────────────┐  CONNECTED   ┌───────────┐
//! │ Disconnected │─────────>│ Connecting │─────────────>│ Connected │
//! └──────────────┘          └────────────┘              └───────────┘
//!        ^                        │ ERROR/timeout/closed       │
//!        └────────────────────────┴────────────────────────────┘
//!                                        disconnect/transport lost
//! ```
//!
//! # Invariants
//!
//! - At most one of `Connecting`/`Connected` holds; [`Connection::begin`] is a
//!   no-op in either.
//! - Outbound sends are only produced in `Connected`.
//! - Every transition out of `Connecting` or `Connected` lands in
//!   `Disconnected`.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use lobby_proto::{
    Channel, Command, Frame, Join, SendPrivate, SendPublic, UserId, destinations,
};

use crate::error::ChatError;

/// Time allowed for the broker to answer `CONNECT`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Actions returned by the connection state machine.
///
/// The driver executes these actions:
/// - `SendFrame`: encode and write the frame to the transport
/// - `Close`: drop the transport with the given reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Send this frame to the broker
    SendFrame(Frame),

    /// Close the transport
    Close {
        /// Reason for closing
        reason: String,
    },
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// `CONNECT` sent, waiting for `CONNECTED`.
    Connecting,
    /// Handshake complete, subscriptions issued.
    Connected,
}

/// Connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Virtual host sent in the `CONNECT` frame
    pub host: String,
    /// Timeout for the broker to answer `CONNECT`
    pub handshake_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { host: "localhost".to_string(), handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT }
    }
}

/// Connection state machine
///
/// Generic over `Instant` so drivers can use a paused or virtual clock.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// When `CONNECT` was sent. `Some` only while `Connecting`.
    connecting_since: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create a connection in [`ConnectionState::Disconnected`]
    pub fn new(config: ConnectionConfig) -> Self {
        Self { state: ConnectionState::Disconnected, config, connecting_since: None }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether sends are currently permitted.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Maximum time allowed for the handshake.
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        self.config.handshake_timeout
    }

    /// Start the handshake.
    ///
    /// Returns `SendFrame(CONNECT)` and enters `Connecting`. Returns no actions
    /// if a handshake is already in flight or complete.
    pub fn begin(&mut self, bearer_token: &str, now: I) -> Vec<ConnectionAction> {
        if self.state != ConnectionState::Disconnected {
            return Vec::new();
        }

        self.state = ConnectionState::Connecting;
        self.connecting_since = Some(now);

        let frame = Frame::connect(&self.config.host, bearer_token);
        vec![ConnectionAction::SendFrame(frame)]
    }

    /// Process a frame received while the handshake is in flight.
    ///
    /// On `CONNECTED` this enters `Connected` and returns the join
    /// notification followed by one `SUBSCRIBE` per [`Channel`]. Frames in any
    /// other state are not the state machine's concern and produce no actions.
    ///
    /// # Errors
    ///
    /// - `ChatError::HandshakeFailed` if the broker answers with `ERROR`
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<Vec<ConnectionAction>, ChatError> {
        match (self.state, frame.command) {
            (ConnectionState::Connecting, Command::Connected) => {
                self.state = ConnectionState::Connected;
                self.connecting_since = None;

                let mut actions = Vec::with_capacity(1 + Channel::ALL.len());
                actions.push(ConnectionAction::SendFrame(Frame::send_json(
                    destinations::JOIN,
                    &Join {},
                )?));
                actions.extend(Channel::ALL.into_iter().map(|channel| {
                    ConnectionAction::SendFrame(Frame::subscribe(
                        channel.subscription_id(),
                        channel.destination(),
                    ))
                }));

                Ok(actions)
            },

            (ConnectionState::Connecting, Command::Error) => {
                let reason = frame
                    .header("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| frame.body.trim().to_string());
                Err(self.handshake_failed(reason))
            },

            _ => Ok(Vec::new()),
        }
    }

    /// Elapsed handshake time, if the timeout is reached. `None` otherwise.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        let since = self.connecting_since?;
        let elapsed = now - since;
        if elapsed >= self.config.handshake_timeout { Some(elapsed) } else { None }
    }

    /// Abandon the handshake once the timeout is reached.
    ///
    /// # Errors
    ///
    /// - `ChatError::HandshakeFailed` if the timeout is reached
    pub fn tick(&mut self, now: I) -> Result<(), ChatError> {
        match self.check_timeout(now) {
            Some(elapsed) => Err(self.handshake_failed(format!("no reply after {elapsed:?}"))),
            None => Ok(()),
        }
    }

    /// Abandon the handshake and return the error to surface.
    pub fn handshake_failed(&mut self, reason: impl Into<String>) -> ChatError {
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        ChatError::HandshakeFailed(reason.into())
    }

    /// The transport closed underneath us. Returns whether we were connected.
    pub fn transport_lost(&mut self) -> bool {
        let was_connected = self.state == ConnectionState::Connected;
        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        was_connected
    }

    /// Tear down.
    ///
    /// Sends `DISCONNECT` only if connected, then unconditionally returns to
    /// `Disconnected`.
    pub fn disconnect(&mut self) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.state == ConnectionState::Connected {
            actions.push(ConnectionAction::SendFrame(Frame::disconnect()));
        }
        if self.state != ConnectionState::Disconnected {
            actions.push(ConnectionAction::Close { reason: "client disconnect".to_string() });
        }

        self.state = ConnectionState::Disconnected;
        self.connecting_since = None;
        actions
    }

    /// Publish to the public room.
    ///
    /// Content is trimmed; empty content produces no actions.
    ///
    /// # Errors
    ///
    /// - `ChatError::NotConnected` if not `Connected`
    /// - `ChatError::SendFailed` if the body cannot be encoded
    pub fn send_public(&self, content: &str) -> Result<Vec<ConnectionAction>, ChatError> {
        self.ensure_connected()?;

        let content = content.trim();
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let body = SendPublic { content: content.to_string() };
        let frame = Frame::send_json(destinations::SEND_PUBLIC, &body)?;
        Ok(vec![ConnectionAction::SendFrame(frame)])
    }

    /// Publish to a single peer.
    ///
    /// Content is trimmed; empty content produces no actions.
    ///
    /// # Errors
    ///
    /// - `ChatError::NotConnected` if not `Connected`
    /// - `ChatError::SendFailed` if the body cannot be encoded
    pub fn send_private(
        &self,
        peer_id: UserId,
        content: &str,
    ) -> Result<Vec<ConnectionAction>, ChatError> {
        self.ensure_connected()?;

        let content = content.trim();
        if content.is_empty() {
            return Ok(Vec::new());
        }

        let body = SendPrivate { content: content.to_string(), receiver_id: peer_id };
        let frame = Frame::send_json(destinations::SEND_PRIVATE, &body)?;
        Ok(vec![ConnectionAction::SendFrame(frame)])
    }

    fn ensure_connected(&self) -> Result<(), ChatError> {
        if self.is_connected() { Ok(()) } else { Err(ChatError::NotConnected) }
    }
}
