//! Protocol error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding frames and payloads.
///
/// None of these are fatal to a session: a frame that fails to decode is
/// logged and skipped by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Command line is not a STOMP command we know.
    #[error("unknown STOMP command: {0:?}")]
    UnknownCommand(String),

    /// Header line without a `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// Header contains an escape sequence STOMP 1.2 does not define.
    #[error("invalid header escape sequence: {0:?}")]
    InvalidEscape(String),

    /// `content-length` is not a number or points past the input.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// Input ended before the blank line that closes the header block.
    #[error("frame truncated before end of headers")]
    Truncated,

    /// Body is not terminated by a NUL octet.
    #[error("frame body is missing its NUL terminator")]
    MissingTerminator,

    /// Frame body is not the JSON document we expected.
    #[error("invalid JSON payload: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
