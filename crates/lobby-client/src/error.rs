//! Error types for the I/O collaborators.
//!
//! These stay inside the client: the session converts them into
//! `lobby_core::ChatError` before they reach the caller.

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error after the connection was established.
    #[error("stream error: {0}")]
    Stream(String),

    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,
}

/// History fetch errors.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// Server answered with a non-success status.
    #[error("unexpected status {0}")]
    Status(u16),

    /// Response body was not the expected envelope.
    #[error("invalid response: {0}")]
    Decode(String),
}
