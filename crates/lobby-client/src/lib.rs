//! Lobby client
//!
//! Async driver for the pure state machines in `lobby-core`. A
//! [`ChatSession`] owns one broker connection: it performs the STOMP
//! handshake, fans inbound frames out into one queue per channel and routes
//! them into the conversation state the consumer reads from.
//!
//! # Components
//!
//! - [`ChatSession`]: connection lifecycle, sends, history and dispatch
//! - [`Transport`] / [`Link`]: how frames reach the broker
//! - [`MemoryTransport`]: in-process broker for tests and demos
//! - [`HistorySource`]: REST history collaborator
//! - `WebSocketTransport` (`transport` feature) and `HttpHistory` (`http`
//!   feature): production implementations

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod history;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;
pub mod session;
pub mod transport;
#[cfg(feature = "transport")]
pub mod websocket;

pub use config::SessionConfig;
pub use error::{HistoryError, TransportError};
pub use history::HistorySource;
#[cfg(feature = "http")]
pub use http::HttpHistory;
pub use memory::{MemoryBroker, MemoryPeer, MemoryTransport};
pub use session::{ChatSession, SessionEvent};
pub use transport::{Link, Transport};
#[cfg(feature = "transport")]
pub use websocket::WebSocketTransport;
