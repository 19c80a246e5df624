//! Chat session.
//!
//! [`ChatSession`] drives the pure [`Connection`] and [`ChatState`] machines
//! over a [`Transport`]. It is the only owner of the link to the broker.
//!
//! # Flow
//!
//! ```text
//! connect ──> CONNECT ──> CONNECTED ──> JOIN + SUBSCRIBE x3 ──> demux task
//!                                                                  │
//!            public queue <───────────┬────────────────────────────┤
//!            private queue <──────────┤                            │
//!            presence queue <─────────┘                            │
//!                   │                                              │
//!             next_event ──> router ──> ChatState           ERROR: logged
//! ```
//!
//! # Invariants
//!
//! - Per-channel order is preserved: each channel has its own FIFO queue.
//!   Across channels there is no ordering.
//! - `disconnect` is the only operation that clears conversation state.
//! - User-visible errors are recorded as the status message before being
//!   returned.

use lobby_core::{
    ChatError, ChatState, Connection, ConnectionAction, ConnectionState, IdentityProvider,
    Routed, User, View, history, router,
};
use lobby_proto::{Channel, Command, Frame, UserId};
use secrecy::ExposeSecret;
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinHandle},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    config::SessionConfig,
    history::HistorySource,
    transport::{Link, Transport},
};

/// Outcome of waiting for inbound traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A frame was applied to the chat state.
    Routed(Routed),
    /// A frame could not be applied and was skipped.
    Skipped(Channel),
    /// The transport closed. Conversation state is kept.
    ConnectionLost,
}

/// Inbound queues and handles of a live connection.
struct LiveLink {
    outbound: mpsc::Sender<Frame>,
    public: mpsc::Receiver<Frame>,
    private: mpsc::Receiver<Frame>,
    presence: mpsc::Receiver<Frame>,
    demux: JoinHandle<()>,
    transport: Option<AbortHandle>,
}

impl LiveLink {
    /// Hang up gracefully: the transport flushes queued frames and closes.
    fn close(self) {
        let Self { outbound, demux, .. } = self;
        drop(outbound);
        demux.abort();
    }

    /// Hang up immediately.
    fn abort(self) {
        self.demux.abort();
        if let Some(task) = self.transport {
            task.abort();
        }
    }
}

/// Real-time chat session.
///
/// # Type Parameters
///
/// - `T`: transport to the broker
/// - `H`: history collaborator
/// - `I`: identity provider supplying the current user and bearer token
pub struct ChatSession<T, H, I>
where
    T: Transport,
    H: HistorySource,
    I: IdentityProvider,
{
    config: SessionConfig,
    transport: T,
    history: H,
    identity: I,
    connection: Connection<Instant>,
    chat: ChatState,
    link: Option<LiveLink>,
}

impl<T, H, I> ChatSession<T, H, I>
where
    T: Transport,
    H: HistorySource,
    I: IdentityProvider,
{
    /// Create a disconnected session.
    pub fn new(config: SessionConfig, transport: T, history: H, identity: I) -> Self {
        let connection = Connection::new(config.connection());
        Self {
            config,
            transport,
            history,
            identity,
            connection,
            chat: ChatState::new(),
            link: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Conversation, presence and attention state.
    pub fn chat(&self) -> &ChatState {
        &self.chat
    }

    /// Latest user-visible alert.
    pub fn status_message(&self) -> Option<&str> {
        self.chat.status_message()
    }

    /// Signed-in user, as reported by the identity provider.
    pub fn current_user(&self) -> Option<User> {
        self.identity.current_user()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open, authenticate and subscribe.
    ///
    /// Resolves immediately without side effects while connecting or
    /// connected. On failure the session is back in `Disconnected`; nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// - `ChatError::AuthRequired` if the identity provider is not signed in
    /// - `ChatError::HandshakeFailed` if the transport cannot be opened, the
    ///   broker answers `ERROR`, closes, or does not answer in time
    pub async fn connect(&mut self) -> Result<(), ChatError> {
        if self.connection.state() != ConnectionState::Disconnected {
            debug!(state = ?self.connection.state(), "connect ignored");
            return Ok(());
        }

        let (Some(user), Some(token)) = (self.identity.current_user(), self.identity.credential())
        else {
            return Err(self.alert(ChatError::AuthRequired));
        };

        info!(endpoint = %self.config.endpoint, user_id = user.id, "connecting");
        let started = Instant::now();
        let actions = self.connection.begin(token.expose_secret(), started);

        let link = match self.transport.connect(&self.config.endpoint).await {
            Ok(link) => link,
            Err(err) => {
                let err = self.connection.handshake_failed(err.to_string());
                return Err(self.alert(err));
            },
        };

        match self.handshake(link, actions, started).await {
            Ok(live) => {
                info!(user_id = user.id, "connected");
                self.link = Some(live);
                Ok(())
            },
            Err(err) => {
                warn!(%err, "handshake failed");
                Err(self.alert(err))
            },
        }
    }

    async fn handshake(
        &mut self,
        mut link: Link,
        actions: Vec<ConnectionAction>,
        started: Instant,
    ) -> Result<LiveLink, ChatError> {
        if let Err(err) = execute(&link.outbound, actions).await {
            link.abort();
            return Err(self.connection.handshake_failed(err));
        }

        let deadline = started + self.connection.handshake_timeout();
        let setup = loop {
            let frame = match tokio::time::timeout_at(deadline, link.inbound.recv()).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    link.abort();
                    return Err(self.connection.handshake_failed("connection closed by broker"));
                },
                Err(_) => match self.connection.tick(Instant::now()) {
                    Ok(()) => continue,
                    Err(err) => {
                        link.abort();
                        return Err(err);
                    },
                },
            };

            debug!(command = %frame.command, "handshake frame");
            match self.connection.handle_frame(&frame) {
                Ok(actions) if self.connection.is_connected() => break actions,
                Ok(_) => {},
                Err(err) => {
                    link.abort();
                    return Err(err);
                },
            }
        };

        if let Err(err) = execute(&link.outbound, setup).await {
            link.abort();
            self.connection.transport_lost();
            return Err(ChatError::HandshakeFailed(err));
        }

        let Link { outbound, inbound, task } = link;
        let capacity = self.config.channel_capacity.max(1);
        let (public_tx, public) = mpsc::channel(capacity);
        let (private_tx, private) = mpsc::channel(capacity);
        let (presence_tx, presence) = mpsc::channel(capacity);
        let demux = tokio::spawn(demultiplex(inbound, Routes {
            public: public_tx,
            private: private_tx,
            presence: presence_tx,
        }));

        Ok(LiveLink { outbound, public, private, presence, demux, transport: task })
    }

    /// Wait for the next inbound frame and apply it.
    ///
    /// Returns `None` while no connection is open.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let link = self.link.as_mut()?;

        let next = tokio::select! {
            Some(frame) = link.public.recv() => Some((Channel::Public, frame)),
            Some(frame) = link.private.recv() => Some((Channel::Private, frame)),
            Some(frame) = link.presence.recv() => Some((Channel::Presence, frame)),
            else => None,
        };

        let Some((channel, frame)) = next else {
            self.connection_lost();
            return Some(SessionEvent::ConnectionLost);
        };
        Some(self.dispatch(channel, &frame))
    }

    /// Apply one inbound frame.
    fn dispatch(&mut self, channel: Channel, frame: &Frame) -> SessionEvent {
        let current = self.identity.current_user().map(|user| user.id);
        match router::route(&mut self.chat, channel, frame, current) {
            Ok(routed) => {
                debug!(?routed, "frame applied");
                SessionEvent::Routed(routed)
            },
            Err(err) => {
                warn!(?channel, %err, "skipping inbound frame");
                SessionEvent::Skipped(channel)
            },
        }
    }

    fn connection_lost(&mut self) {
        if let Some(link) = self.link.take() {
            link.abort();
        }
        if self.connection.transport_lost() {
            warn!("connection lost");
            self.chat.set_status("Connection lost");
        }
    }

    /// Tear down the connection and forget all conversation state.
    ///
    /// Sends `DISCONNECT` if connected. Always ends in `Disconnected`.
    pub fn disconnect(&mut self) {
        let actions = self.connection.disconnect();
        let link = self.link.take();

        for action in actions {
            match action {
                ConnectionAction::SendFrame(frame) => {
                    if let Some(link) = &link
                        && let Err(err) = link.outbound.try_send(frame)
                    {
                        debug!(%err, "could not queue DISCONNECT");
                    }
                },
                ConnectionAction::Close { reason } => info!(%reason, "disconnected"),
            }
        }

        if let Some(link) = link {
            link.close();
        }
        self.chat.reset();
    }

    /// Publish to the public room.
    ///
    /// Blank content is ignored. Does not wait for acknowledgement.
    ///
    /// # Errors
    ///
    /// - `ChatError::NotConnected` if not connected
    /// - `ChatError::SendFailed` if the transport refuses the frame
    pub fn send_public(&mut self, content: &str) -> Result<(), ChatError> {
        let actions = self.connection.send_public(content).map_err(|err| self.alert(err))?;
        self.execute_now(actions)
    }

    /// Publish to `peer_id`.
    ///
    /// Blank content is ignored. The thread with the peer is created if
    /// needed; the broker echoes the message back on the private queue.
    ///
    /// # Errors
    ///
    /// - `ChatError::NotConnected` if not connected
    /// - `ChatError::SendFailed` if the transport refuses the frame
    pub fn send_private(&mut self, peer_id: UserId, content: &str) -> Result<(), ChatError> {
        let actions =
            self.connection.send_private(peer_id, content).map_err(|err| self.alert(err))?;
        if actions.is_empty() {
            return Ok(());
        }

        self.execute_now(actions)?;
        self.chat.ensure_conversation(peer_id);
        Ok(())
    }

    fn execute_now(&mut self, actions: Vec<ConnectionAction>) -> Result<(), ChatError> {
        for action in actions {
            let ConnectionAction::SendFrame(frame) = action else {
                continue;
            };
            let sent = match &self.link {
                Some(link) => link.outbound.try_send(frame).map_err(|err| err.to_string()),
                None => Err("no open connection".to_string()),
            };
            if let Err(reason) = sent {
                warn!(%reason, "send failed");
                return Err(self.alert(ChatError::SendFailed(reason)));
            }
        }
        Ok(())
    }

    /// Replace the public log with the most recent `limit` messages.
    ///
    /// `None` uses the configured default. Failures are logged and leave the
    /// log unchanged.
    ///
    /// # Errors
    ///
    /// - `ChatError::HistoryFetchFailed` if the fetch fails or the server
    ///   reports failure
    pub async fn load_public_history(&mut self, limit: Option<usize>) -> Result<usize, ChatError> {
        let limit = limit.unwrap_or(self.config.history_limit);
        let current = self.identity.current_user().map(|user| user.id);

        let result = match self.history.fetch_public(limit).await {
            Ok(page) => history::apply_public(&mut self.chat, page, current),
            Err(err) => Err(ChatError::HistoryFetchFailed(err.to_string())),
        };
        log_history("public", &result);
        result
    }

    /// Replace the thread with `peer_id` with its most recent `limit`
    /// messages, creating the thread if needed.
    ///
    /// # Errors
    ///
    /// - `ChatError::HistoryFetchFailed` if the fetch fails or the server
    ///   reports failure
    pub async fn load_private_history(
        &mut self,
        peer_id: UserId,
        limit: Option<usize>,
    ) -> Result<usize, ChatError> {
        let limit = limit.unwrap_or(self.config.history_limit);
        let current = self.identity.current_user().map(|user| user.id);

        let result = match self.history.fetch_private(peer_id, limit).await {
            Ok(page) => history::apply_private(&mut self.chat, peer_id, page, current),
            Err(err) => Err(ChatError::HistoryFetchFailed(err.to_string())),
        };
        log_history("private", &result);
        result
    }

    /// Replace the roster from a REST snapshot.
    ///
    /// # Errors
    ///
    /// - `ChatError::HistoryFetchFailed` if the fetch fails or the server
    ///   reports failure
    pub async fn refresh_presence(&mut self) -> Result<usize, ChatError> {
        let current = self.identity.current_user().map(|user| user.id);

        let result = match self.history.fetch_online_users().await {
            Ok(users) => history::apply_online_users(&mut self.chat, users, current),
            Err(err) => Err(ChatError::HistoryFetchFailed(err.to_string())),
        };
        log_history("presence", &result);
        result
    }

    /// Ask the server whether `user_id` is online. The roster is untouched.
    ///
    /// # Errors
    ///
    /// - `ChatError::HistoryFetchFailed` if the lookup fails or the server
    ///   reports failure
    pub async fn check_online(&self, user_id: UserId) -> Result<bool, ChatError> {
        let result = match self.history.check_online(user_id).await {
            Ok(status) => history::online_status(status),
            Err(err) => Err(ChatError::HistoryFetchFailed(err.to_string())),
        };
        if let Err(err) = &result {
            warn!(user_id, %err, "online lookup failed");
        }
        result
    }

    /// Make the thread with `peer_id` active and mark it read.
    pub fn start_private_chat(&mut self, peer_id: UserId) {
        self.chat.start_private_chat(peer_id);
    }

    /// Return to the public room.
    pub fn close_private_chat(&mut self) {
        self.chat.close_private_chat();
    }

    /// Tell the session which view the consumer is showing.
    pub fn set_view(&mut self, view: View) {
        self.chat.set_view(view);
    }

    /// Reset the public unread counter.
    pub fn clear_unread(&mut self) {
        self.chat.clear_unread();
    }

    fn alert(&mut self, err: ChatError) -> ChatError {
        if err.is_user_visible() {
            self.chat.set_status(err.to_string());
        }
        err
    }
}

impl<T, H, I> Drop for ChatSession<T, H, I>
where
    T: Transport,
    H: HistorySource,
    I: IdentityProvider,
{
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn log_history(kind: &str, result: &Result<usize, ChatError>) {
    match result {
        Ok(count) => debug!(kind, count, "history loaded"),
        Err(err) => warn!(kind, %err, "history load failed"),
    }
}

/// Send every `SendFrame` action, waiting for buffer space.
async fn execute(
    outbound: &mpsc::Sender<Frame>,
    actions: Vec<ConnectionAction>,
) -> Result<(), String> {
    for action in actions {
        if let ConnectionAction::SendFrame(frame) = action {
            debug!(command = %frame.command, "sending frame");
            outbound.send(frame).await.map_err(|_| "connection closed".to_string())?;
        }
    }
    Ok(())
}

struct Routes {
    public: mpsc::Sender<Frame>,
    private: mpsc::Sender<Frame>,
    presence: mpsc::Sender<Frame>,
}

/// Split inbound frames into one queue per channel.
///
/// Ends when the transport closes or the session stops listening, dropping
/// the queue senders so the session observes the closure.
async fn demultiplex(mut inbound: mpsc::Receiver<Frame>, routes: Routes) {
    while let Some(frame) = inbound.recv().await {
        match frame.command {
            Command::Message => {
                let channel = frame
                    .header("subscription")
                    .and_then(Channel::from_subscription_id)
                    .or_else(|| frame.header("destination").and_then(Channel::from_destination));

                let Some(channel) = channel else {
                    warn!(destination = ?frame.header("destination"), "message on unknown channel");
                    continue;
                };

                let queue = match channel {
                    Channel::Public => &routes.public,
                    Channel::Private => &routes.private,
                    Channel::Presence => &routes.presence,
                };
                if queue.send(frame).await.is_err() {
                    break;
                }
            },
            Command::Error => {
                warn!(message = frame.header("message").unwrap_or_default(), "broker error");
            },
            other => debug!(command = %other, "ignoring frame"),
        }
    }
    debug!("inbound stream ended");
}
