//! WebSocket transport.
//!
//! Each WebSocket text message carries one STOMP frame. Heart-beat messages
//! decode to nothing and are dropped here; undecodable messages are logged
//! and skipped.

use futures::{SinkExt, StreamExt, stream::SplitSink};
use lobby_proto::Frame;
use tokio::sync::mpsc;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};
use tracing::{debug, warn};

use crate::{
    config::DEFAULT_CHANNEL_CAPACITY,
    error::TransportError,
    transport::{Link, Transport},
};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type Sink = SplitSink<Socket, Message>;

/// STOMP over a raw WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    capacity: usize,
}

impl WebSocketTransport {
    /// Transport buffering `capacity` frames each way.
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1) }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Transport for WebSocketTransport {
    async fn connect(&mut self, endpoint: &str) -> Result<Link, TransportError> {
        let (socket, _) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connection(format!("{endpoint}: {e}")))?;
        debug!(endpoint, "websocket open");

        let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(self.capacity);
        let (from_server_tx, from_server_rx) = mpsc::channel::<Frame>(self.capacity);

        let handle = tokio::spawn(async move {
            if let Err(e) = run_socket(socket, to_server_rx, from_server_tx).await {
                warn!(error = %e, "websocket closed with error");
            }
        });

        Ok(Link {
            outbound: to_server_tx,
            inbound: from_server_rx,
            task: Some(handle.abort_handle()),
        })
    }
}

/// Bridge between the frame channels and the socket.
///
/// Returns when the broker closes, or when the session drops its sender after
/// everything queued has been written. If the session stops reading first,
/// queued outbound frames are still written before the close.
async fn run_socket(
    socket: Socket,
    mut to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<Frame>,
) -> Result<(), TransportError> {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(frame) = outgoing else { break };
                write_frame(&mut write, &frame).await?;
            },
            incoming = read.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(TransportError::Stream(format!("read failed: {e}"))),
                };

                match Frame::decode(text.as_str()) {
                    Ok(Some(frame)) => {
                        if from_server.send(frame).await.is_err() {
                            debug!("session stopped reading, flushing outbound");
                            while let Some(frame) = to_server.recv().await {
                                write_frame(&mut write, &frame).await?;
                            }
                            break;
                        }
                    },
                    Ok(None) => {},
                    Err(e) => warn!(error = %e, "undecodable frame"),
                }
            },
        }
    }

    if let Err(e) = write.send(Message::Close(None)).await {
        debug!(error = %e, "close failed");
    }
    Ok(())
}

async fn write_frame(write: &mut Sink, frame: &Frame) -> Result<(), TransportError> {
    write
        .send(Message::Text(frame.encode().into()))
        .await
        .map_err(|e| TransportError::Stream(format!("write failed: {e}")))
}
