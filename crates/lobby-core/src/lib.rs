//! Lobby core
//!
//! Pure state machines for a STOMP chat session. Nothing here performs I/O:
//! the connection state machine returns [`ConnectionAction`]s for a driver to
//! execute, and the conversation state is updated by feeding it decoded
//! frames and history responses.
//!
//! # Components
//!
//! - [`Connection`]: `Disconnected -> Connecting -> Connected` lifecycle and
//!   outbound frame construction
//! - [`ConversationStore`]: bounded public log and private threads
//! - [`PresenceTracker`]: online roster excluding the current user
//! - [`ChatState`]: active conversation, view, unread counters and alerts
//! - [`router`]: classifies inbound frames and applies them to [`ChatState`]
//! - [`history`]: applies fetched history with replace semantics
//! - [`identity`]: the current user and bearer credential

#![forbid(unsafe_code)]

pub mod chat;
pub mod connection;
pub mod error;
pub mod history;
pub mod identity;
pub mod message;
pub mod presence;
pub mod router;
pub mod store;

pub use chat::{ChatState, View};
pub use connection::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionState, DEFAULT_HANDSHAKE_TIMEOUT,
};
pub use error::{ChatError, RouteError};
pub use identity::{IdentityProvider, StaticIdentity, User};
pub use message::ChatMessage;
pub use presence::PresenceTracker;
pub use router::Routed;
pub use store::{ConversationStore, PRIVATE_CAPACITY, PUBLIC_CAPACITY, PrivateConversation};
