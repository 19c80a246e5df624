//! In-process transport.
//!
//! [`MemoryTransport`] hands every connection to a [`MemoryBroker`], which
//! plays the broker side through a [`MemoryPeer`]. No encoding happens: frames
//! cross as values. Dropping the broker makes further connects fail.

use lobby_proto::{Channel, Command, Frame};
use tokio::sync::mpsc;

use crate::{
    error::TransportError,
    transport::{Link, Transport},
};

/// Client side of the in-process transport.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    accepts: mpsc::UnboundedSender<MemoryPeer>,
    capacity: usize,
}

/// Broker side: yields one [`MemoryPeer`] per client connect.
#[derive(Debug)]
pub struct MemoryBroker {
    accepts: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Broker end of one connection.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Endpoint the client asked for.
    pub endpoint: String,
    /// Frames to the client.
    pub to_client: mpsc::Sender<Frame>,
    /// Frames from the client.
    pub from_client: mpsc::Receiver<Frame>,
    delivered: u64,
}

impl MemoryTransport {
    /// Transport and its broker, buffering `capacity` frames each way.
    pub fn new(capacity: usize) -> (Self, MemoryBroker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { accepts: tx, capacity: capacity.max(1) }, MemoryBroker { accepts: rx })
    }
}

impl Transport for MemoryTransport {
    async fn connect(&mut self, endpoint: &str) -> Result<Link, TransportError> {
        let (to_server, from_client) = mpsc::channel(self.capacity);
        let (to_client, from_server) = mpsc::channel(self.capacity);

        let peer =
            MemoryPeer { endpoint: endpoint.to_string(), to_client, from_client, delivered: 0 };
        self.accepts
            .send(peer)
            .map_err(|_| TransportError::Connection("broker is not listening".to_string()))?;

        Ok(Link { outbound: to_server, inbound: from_server, task: None })
    }
}

impl MemoryBroker {
    /// Next client connection. `None` once every transport is dropped.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepts.recv().await
    }

    /// A pending connection, without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accepts.try_recv().ok()
    }
}

impl MemoryPeer {
    /// Next frame from the client. `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Send a frame to the client. Returns `false` if the client is gone.
    pub async fn send(&self, frame: Frame) -> bool {
        self.to_client.send(frame).await.is_ok()
    }

    /// Read `CONNECT` and answer `CONNECTED`.
    ///
    /// Returns the `CONNECT` frame, or `None` if the client sent something
    /// else or hung up.
    pub async fn accept_handshake(&mut self) -> Option<Frame> {
        let connect = self.recv().await.filter(|frame| frame.command == Command::Connect)?;
        let reply = Frame::new(Command::Connected).with_header("version", "1.2");
        self.send(reply).await.then_some(connect)
    }

    /// Read `CONNECT` and answer `ERROR`.
    pub async fn reject_handshake(&mut self, message: &str) -> Option<Frame> {
        let connect = self.recv().await.filter(|frame| frame.command == Command::Connect)?;
        let reply = Frame::new(Command::Error).with_header("message", message);
        self.send(reply).await.then_some(connect)
    }

    /// Read the `n` frames the client sent next.
    pub async fn recv_many(&mut self, n: usize) -> Vec<Frame> {
        let mut frames = Vec::with_capacity(n);
        while frames.len() < n {
            match self.recv().await {
                Some(frame) => frames.push(frame),
                None => break,
            }
        }
        frames
    }

    /// Deliver a `MESSAGE` on `channel`, as the broker would.
    pub async fn deliver(&mut self, channel: Channel, body: impl Into<String>) -> bool {
        self.delivered += 1;
        let frame = Frame::new(Command::Message)
            .with_header("destination", channel.destination())
            .with_header("subscription", channel.subscription_id())
            .with_header("message-id", self.delivered.to_string())
            .with_header("content-type", "application/json")
            .with_body(body);
        self.send(frame).await
    }
}
