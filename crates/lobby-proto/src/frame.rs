//! STOMP 1.2 text frames.
//!
//! Layout on the wire:
//!
//! ```text
//! COMMAND\n
//! name:value\n        (zero or more)
//! \n
//! body\0
//! ```
//!
//! Header names and values are escaped (`\\`, `\n`, `\r`, `\c`) on every frame
//! except `CONNECT` and `CONNECTED`, which STOMP 1.2 leaves raw for backwards
//! compatibility with 1.0 brokers. Lines may end in `\n` or `\r\n`.
//!
//! A payload consisting only of end-of-line octets is a heart-beat and decodes
//! to `None`.
//!
//! # Invariants
//!
//! - Repeated headers keep their order; [`Frame::header`] returns the first
//!   occurrence as STOMP 1.2 requires.
//! - When `content-length` is present it decides where the body ends, so bodies
//!   may contain NUL octets. Without it the body ends at the first NUL.

use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::errors::{ProtocolError, Result};

/// STOMP frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Client handshake (1.2 spelling).
    Stomp,
    /// Server handshake reply.
    Connected,
    /// Publish to a destination.
    Send,
    /// Open a subscription.
    Subscribe,
    /// Close a subscription.
    Unsubscribe,
    /// Acknowledge a message.
    Ack,
    /// Reject a message.
    Nack,
    /// Start a transaction.
    Begin,
    /// Commit a transaction.
    Commit,
    /// Roll back a transaction.
    Abort,
    /// Graceful close.
    Disconnect,
    /// Message delivered on a subscription.
    Message,
    /// Receipt for a client frame.
    Receipt,
    /// Broker error.
    Error,
}

impl Command {
    /// Every command, in STOMP 1.2 order.
    pub const ALL: [Command; 15] = [
        Self::Connect,
        Self::Stomp,
        Self::Connected,
        Self::Send,
        Self::Subscribe,
        Self::Unsubscribe,
        Self::Ack,
        Self::Nack,
        Self::Begin,
        Self::Commit,
        Self::Abort,
        Self::Disconnect,
        Self::Message,
        Self::Receipt,
        Self::Error,
    ];

    /// Command keyword as written on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Whether header names and values on this command are escaped.
    fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order.
    headers: Vec<(String, String)>,
    /// Frame body (JSON text for every frame this crate produces).
    pub body: String,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self { command, headers: Vec::new(), body: String::new() }
    }

    /// Append a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// All headers in wire order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// `CONNECT` frame carrying a bearer credential.
    ///
    /// Heart-beating is disabled in both directions; the session has no
    /// reconnect logic that could act on a missed beat.
    pub fn connect(host: &str, bearer_token: &str) -> Self {
        Self::new(Command::Connect)
            .with_header("accept-version", "1.2,1.1,1.0")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
            .with_header("Authorization", format!("Bearer {bearer_token}"))
    }

    /// `SUBSCRIBE` frame.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(Command::Subscribe).with_header("id", id).with_header("destination", destination)
    }

    /// `SEND` frame with a JSON body.
    pub fn send_json<T: Serialize>(destination: &str, body: &T) -> Result<Self> {
        let body = serde_json::to_string(body)?;
        Ok(Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_header("content-length", body.len().to_string())
            .with_body(body))
    }

    /// `DISCONNECT` frame.
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Deserialize the JSON body.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Encode into wire text, including the trailing NUL.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(32 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode one frame from wire text.
    ///
    /// Returns `Ok(None)` for heart-beats. Octets after the NUL terminator are
    /// ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnknownCommand` if the command line is not STOMP
    /// - `ProtocolError::Truncated` if the header block never ends
    /// - `ProtocolError::MalformedHeader` / `InvalidEscape` for bad headers
    /// - `ProtocolError::InvalidContentLength` / `MissingTerminator` for bad
    ///   bodies
    pub fn decode(input: &str) -> Result<Option<Self>> {
        let input = input.trim_start_matches(['\r', '\n']);
        if input.is_empty() {
            return Ok(None);
        }

        let mut offset = 0;
        let mut command = None;
        let mut headers = Vec::new();
        let mut headers_closed = false;

        for raw_line in input.split_inclusive('\n') {
            if !raw_line.ends_with('\n') {
                break;
            }
            offset += raw_line.len();
            let line = raw_line.trim_end_matches('\n');
            let line = line.strip_suffix('\r').unwrap_or(line);

            let Some(command) = command else {
                command = Some(line.parse::<Command>()?);
                continue;
            };

            if line.is_empty() {
                headers_closed = true;
                break;
            }

            headers.push(parse_header(line, command.escapes_headers())?);
        }

        let (Some(command), true) = (command, headers_closed) else {
            return Err(ProtocolError::Truncated);
        };

        let rest = &input[offset..];
        let content_length = headers
            .iter()
            .find(|(name, _)| name == "content-length")
            .map(|(_, value)| value.as_str());

        let body = match content_length {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| ProtocolError::InvalidContentLength(raw.to_string()))?;
                let body = rest
                    .get(..len)
                    .ok_or_else(|| ProtocolError::InvalidContentLength(raw.to_string()))?;
                if !rest[len..].starts_with('\0') {
                    return Err(ProtocolError::MissingTerminator);
                }
                body
            },
            None => {
                let end = rest.find('\0').ok_or(ProtocolError::MissingTerminator)?;
                &rest[..end]
            },
        };

        Ok(Some(Self { command, headers, body: body.to_string() }))
    }
}

fn parse_header(line: &str, escaped: bool) -> Result<(String, String)> {
    let (name, value) =
        line.split_once(':').ok_or_else(|| ProtocolError::MalformedHeader(line.to_string()))?;

    if escaped {
        Ok((unescape(name)?, unescape(value)?))
    } else {
        Ok((name.to_string(), value.to_string()))
    }
}

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some(other) => return Err(ProtocolError::InvalidEscape(format!("\\{other}"))),
            None => return Err(ProtocolError::InvalidEscape("\\".to_string())),
        }
    }

    Ok(out)
}
