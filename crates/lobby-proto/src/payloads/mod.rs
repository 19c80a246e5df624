//! JSON frame bodies.
//!
//! Field names follow the broker's camelCase JSON. Every inbound field except
//! `content` and `userId` is optional: system notices have no sender, public
//! messages have no receiver, and roster entries may be sparse.

pub mod api;
pub mod message;
pub mod presence;

pub use api::ApiResponse;
pub use message::{
    ChatType, Join, MessageKind, SendPrivate, SendPublic, WireMessage, WireTimestamp,
};
pub use presence::{OnlineUser, PresenceStatus};

/// Stable user identifier assigned by the server.
pub type UserId = i64;

/// Server-assigned message identifier.
pub type MessageId = i64;
