//! Integration tests for WebSocketTransport against a local WebSocket server.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - Only decodable, non-heart-beat messages reach the inbound channel
//! - Frames queued before hang-up are on the wire before the close
#![cfg(feature = "transport")]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use lobby_client::{Link, Transport, TransportError, WebSocketTransport};
use lobby_proto::{Command, Frame};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

type ServerSocket = WebSocketStream<TcpStream>;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}", listener.local_addr().unwrap());
    (listener, endpoint)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

fn text(body: &str) -> Message {
    Message::Text(body.to_string().into())
}

fn frame_message(frame: &Frame) -> Message {
    Message::Text(frame.encode().into())
}

/// Commands of every text frame the client sent, and whether it then closed.
async fn read_until_close(ws: &mut ServerSocket) -> (Vec<Command>, bool) {
    let mut commands = Vec::new();
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(body) => {
                commands.push(Frame::decode(body.as_str()).unwrap().unwrap().command);
            },
            Message::Close(_) => return (commands, true),
            _ => {},
        }
    }
    (commands, false)
}

#[tokio::test]
async fn heartbeats_and_garbage_are_skipped() {
    let (listener, endpoint) = listen().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(text("\n")).await.unwrap();
        ws.send(text("BOGUS\n\n\0")).await.unwrap();
        ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
        let connected = Frame::new(Command::Connected).with_header("version", "1.2");
        ws.send(frame_message(&connected)).await.unwrap();
        ws
    });

    let mut link = WebSocketTransport::new(8).connect(&endpoint).await.unwrap();
    let _ws = server.await.unwrap();

    let frame = link.inbound.recv().await.unwrap();
    assert_eq!(frame.command, Command::Connected);
    assert_eq!(frame.header("version"), Some("1.2"));
    assert!(link.inbound.try_recv().is_err());
}

#[tokio::test]
async fn queued_frames_are_written_before_close() {
    let (listener, endpoint) = listen().await;
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        read_until_close(&mut ws).await
    });

    let link = WebSocketTransport::new(8).connect(&endpoint).await.unwrap();
    link.outbound.send(Frame::new(Command::Send).with_body("{}")).await.unwrap();
    link.outbound.send(Frame::disconnect()).await.unwrap();
    drop(link);

    let (commands, closed) = server.await.unwrap();
    assert_eq!(commands, vec![Command::Send, Command::Disconnect]);
    assert!(closed);
}

#[tokio::test]
async fn outbound_is_flushed_after_session_stops_reading() {
    let (listener, endpoint) = listen().await;
    let (receipt_sent, receipt_sent_rx) = oneshot::channel();
    let server = tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        let receipt = Frame::new(Command::Receipt).with_header("receipt-id", "1");
        ws.send(frame_message(&receipt)).await.unwrap();
        receipt_sent.send(()).unwrap();
        read_until_close(&mut ws).await
    });

    let Link { outbound, inbound, .. } =
        WebSocketTransport::new(8).connect(&endpoint).await.unwrap();
    drop(inbound);

    // Give the socket task time to find nobody is reading.
    receipt_sent_rx.await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    outbound.send(Frame::disconnect()).await.unwrap();
    drop(outbound);

    let (commands, closed) = server.await.unwrap();
    assert_eq!(commands, vec![Command::Disconnect]);
    assert!(closed);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connection_error() {
    let (listener, endpoint) = listen().await;
    drop(listener);

    let err = WebSocketTransport::default().connect(&endpoint).await.unwrap_err();
    assert!(matches!(err, TransportError::Connection(_)));
}
