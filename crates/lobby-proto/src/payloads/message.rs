//! Chat message payloads.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::{MessageId, UserId};

/// Message category assigned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Ordinary user text.
    Text,
    /// Server notice.
    System,
    /// A user joined the room.
    Join,
    /// A user left the room.
    Leave,
}

/// Conversation the message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatType {
    /// Public room.
    Public,
    /// One-to-one conversation.
    Private,
}

/// Server timestamp as it appears on the wire.
///
/// Brokers configured with ISO date output send text; a bare Jackson
/// `JavaTimeModule` sends `[year, month, day, hour, minute, second, nanos]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// RFC 3339 or ISO local date-time text.
    Text(String),
    /// Date-time components.
    Parts(Vec<u32>),
}

impl WireTimestamp {
    /// Resolve to a point in time.
    ///
    /// Local date-times without an offset are interpreted in the local time
    /// zone. Returns `None` when the value cannot be interpreted.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(raw) => parse_timestamp(raw),
            Self::Parts(parts) => {
                let [year, month, day, hour, minute, rest @ ..] = parts.as_slice() else {
                    return None;
                };
                let second = rest.first().copied().unwrap_or(0);
                let nanos = rest.get(1).copied().unwrap_or(0);
                let naive = NaiveDate::from_ymd_opt(*year as i32, *month, *day)?
                    .and_hms_nano_opt(*hour, *minute, second, nanos)?;
                from_local(&naive)
            },
        }
    }
}

/// Parse a textual server timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    from_local(&naive)
}

fn from_local(naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Local.from_local_datetime(naive).earliest().map(|ts| ts.with_timezone(&Utc))
}

/// Message as delivered by the broker or returned by the history API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Server-assigned id. Absent on system notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Message category.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    /// Public or private.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<ChatType>,
    /// Author. Absent on system notices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    /// Author display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Recipient of a private message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    /// Room of a public message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Server creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<WireTimestamp>,
}

impl WireMessage {
    /// Creation time resolved to UTC.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.create_time.as_ref().and_then(WireTimestamp::to_utc)
    }
}

/// Body of the join notification sent after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Join {}

/// Body published to the public room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPublic {
    /// Trimmed text content.
    pub content: String,
}

/// Body published to a single peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPrivate {
    /// Trimmed text content.
    pub content: String,
    /// Peer receiving the message.
    pub receiver_id: UserId,
}
