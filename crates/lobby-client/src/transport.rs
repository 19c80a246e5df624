//! Transport abstraction.
//!
//! A transport only moves whole STOMP frames. Encoding, decoding and
//! heart-beat filtering happen inside the transport so the session only ever
//! sees [`Frame`]s.

use std::future::Future;

use lobby_proto::Frame;
use tokio::{sync::mpsc, task::AbortHandle};

use crate::error::TransportError;

/// Handle to an open connection.
///
/// Dropping `outbound` lets the transport flush what is queued and close
/// gracefully. `task` force-stops the I/O task if the transport has one.
#[derive(Debug)]
pub struct Link {
    /// Frames to the broker.
    pub outbound: mpsc::Sender<Frame>,
    /// Frames from the broker. Closes when the connection does.
    pub inbound: mpsc::Receiver<Frame>,
    /// I/O task, if any.
    pub task: Option<AbortHandle>,
}

impl Link {
    /// Stop the I/O task immediately.
    pub fn abort(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Opens connections to the broker.
pub trait Transport: Send {
    /// Open a connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn connect(
        &mut self,
        endpoint: &str,
    ) -> impl Future<Output = Result<Link, TransportError>> + Send;
}
