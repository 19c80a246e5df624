//! Ingested chat messages.

use chrono::{DateTime, Utc};
use lobby_proto::{ChatType, MessageId, MessageKind, UserId, WireMessage};

/// A delivered or fetched message.
///
/// Immutable once built. `is_own` is decided against the current user at
/// ingestion and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    id: Option<MessageId>,
    sender_id: Option<UserId>,
    sender_name: Option<String>,
    receiver_id: Option<UserId>,
    content: String,
    kind: MessageKind,
    chat_type: Option<ChatType>,
    room_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    is_own: bool,
}

impl ChatMessage {
    /// Ingest a wire message on behalf of `current_user`.
    pub fn from_wire(wire: WireMessage, current_user: Option<UserId>) -> Self {
        let created_at = wire.created_at();
        let is_own = matches!((wire.sender_id, current_user), (Some(a), Some(b)) if a == b);

        Self {
            id: wire.id,
            sender_id: wire.sender_id,
            sender_name: wire.sender_name,
            receiver_id: wire.receiver_id,
            content: wire.content,
            kind: wire.kind.unwrap_or(MessageKind::Text),
            chat_type: wire.chat_type,
            room_id: wire.room_id,
            created_at,
            is_own,
        }
    }

    /// Server id, if assigned.
    pub fn id(&self) -> Option<MessageId> {
        self.id
    }

    /// Author. `None` for system notices.
    pub fn sender_id(&self) -> Option<UserId> {
        self.sender_id
    }

    /// Author name as sent by the server.
    pub fn sender_name(&self) -> Option<&str> {
        self.sender_name.as_deref()
    }

    /// Recipient of a private message.
    pub fn receiver_id(&self) -> Option<UserId> {
        self.receiver_id
    }

    /// Text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Message category. Defaults to [`MessageKind::Text`] when absent.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Public or private, as labelled by the server.
    pub fn chat_type(&self) -> Option<ChatType> {
        self.chat_type
    }

    /// Room of a public message.
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Server creation time.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Whether the current user sent this message.
    pub fn is_own(&self) -> bool {
        self.is_own
    }

    /// The other participant of a private message, seen from `current_user`.
    pub fn peer_of(&self, current_user: UserId) -> Option<UserId> {
        if self.sender_id == Some(current_user) { self.receiver_id } else { self.sender_id }
    }
}
