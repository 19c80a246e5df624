//! Lobby wire protocol
//!
//! The chat broker speaks STOMP 1.2 over a WebSocket. Every WebSocket text
//! message carries one STOMP [`Frame`]; frame bodies are JSON documents
//! described in [`payloads`].
//!
//! # Components
//!
//! - [`Frame`] / [`Command`]: STOMP text frame codec
//! - [`Channel`]: the three logical inbound channels and their destinations
//! - [`payloads`]: JSON bodies (messages, presence roster, REST envelopes)

#![forbid(unsafe_code)]

pub mod destinations;
pub mod errors;
pub mod frame;
pub mod payloads;

pub use destinations::Channel;
pub use errors::ProtocolError;
pub use frame::{Command, Frame};
pub use payloads::{
    ApiResponse, ChatType, Join, MessageId, MessageKind, OnlineUser, PresenceStatus, SendPrivate,
    SendPublic, UserId, WireMessage, WireTimestamp,
};
