//! Error types for the chat session.
//!
//! [`ChatError`] is what session operations return to the caller. Every
//! variant is recovered locally; nothing is retried. [`RouteError`] explains
//! why an inbound frame was skipped and never reaches the caller.

use lobby_proto::ProtocolError;
use thiserror::Error;

/// Errors returned by session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The identity provider has no user or no credential.
    #[error("not signed in")]
    AuthRequired,

    /// Transport could not be opened, the broker rejected the handshake, or it
    /// did not answer in time.
    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    /// A send was attempted while not connected.
    #[error("not connected")]
    NotConnected,

    /// The transport refused an outbound frame.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// History could not be fetched or the server reported failure.
    #[error("history fetch failed: {0}")]
    HistoryFetchFailed(String),
}

impl ChatError {
    /// Whether this error is surfaced to the user as an alert.
    ///
    /// History failures are only logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::HistoryFetchFailed(_))
    }
}

impl From<ProtocolError> for ChatError {
    fn from(err: ProtocolError) -> Self {
        Self::SendFailed(err.to_string())
    }
}

/// Reasons an inbound frame is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Body did not decode as the channel's payload.
    #[error("undecodable frame: {0}")]
    Decode(#[from] ProtocolError),

    /// A private frame arrived before the current user is known.
    #[error("private message received without a current user")]
    NoCurrentUser,

    /// Neither endpoint of a private frame is another user.
    #[error("private message has no peer")]
    NoPeer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_history_failures_are_silent() {
        assert!(ChatError::AuthRequired.is_user_visible());
        assert!(ChatError::NotConnected.is_user_visible());
        assert!(ChatError::SendFailed("closed".into()).is_user_visible());
        assert!(ChatError::HandshakeFailed("refused".into()).is_user_visible());
        assert!(!ChatError::HistoryFetchFailed("500".into()).is_user_visible());
    }
}
