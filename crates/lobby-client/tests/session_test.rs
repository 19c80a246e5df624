//! Integration tests for ChatSession against the in-memory broker.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - Connection state matches what the broker saw
//! - Frames land in the right conversation, in order
//! - User-visible failures are recorded as the status message

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use lobby_client::{
    ChatSession, HistoryError, HistorySource, MemoryBroker, MemoryPeer, MemoryTransport,
    SessionConfig, SessionEvent,
};
use lobby_core::{ChatError, ConnectionState, Routed, StaticIdentity, User, View};
use lobby_proto::{ApiResponse, Channel, Command, Frame, OnlineUser, UserId, WireMessage};
use secrecy::SecretString;

const ME: UserId = 1;
const CAPACITY: usize = 16;

#[derive(Default)]
struct Script {
    public: Vec<WireMessage>,
    private: HashMap<UserId, Vec<WireMessage>>,
    online: Vec<OnlineUser>,
    failing: bool,
    requested_limits: Vec<usize>,
}

/// History source answering from a shared script.
#[derive(Clone, Default)]
struct ScriptedHistory(Arc<Mutex<Script>>);

impl ScriptedHistory {
    fn edit(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.0.lock().unwrap());
    }

    fn page(
        &self,
        pick: impl FnOnce(&Script) -> Vec<WireMessage>,
        limit: usize,
    ) -> ApiResponse<Vec<WireMessage>> {
        let mut script = self.0.lock().unwrap();
        script.requested_limits.push(limit);
        if script.failing {
            return ApiResponse::failed("history unavailable");
        }
        let all = pick(&script);
        let skip = all.len().saturating_sub(limit);
        ApiResponse::ok(all.into_iter().skip(skip).collect())
    }
}

impl HistorySource for ScriptedHistory {
    async fn fetch_public(
        &self,
        limit: usize,
    ) -> Result<ApiResponse<Vec<WireMessage>>, HistoryError> {
        Ok(self.page(|s| s.public.clone(), limit))
    }

    async fn fetch_private(
        &self,
        peer_id: UserId,
        limit: usize,
    ) -> Result<ApiResponse<Vec<WireMessage>>, HistoryError> {
        Ok(self.page(|s| s.private.get(&peer_id).cloned().unwrap_or_default(), limit))
    }

    async fn fetch_online_users(&self) -> Result<ApiResponse<Vec<OnlineUser>>, HistoryError> {
        let script = self.0.lock().unwrap();
        if script.failing {
            return Err(HistoryError::Status(503));
        }
        Ok(ApiResponse::ok(script.online.clone()))
    }

    async fn check_online(&self, user_id: UserId) -> Result<ApiResponse<bool>, HistoryError> {
        let script = self.0.lock().unwrap();
        if script.failing {
            return Err(HistoryError::Status(503));
        }
        Ok(ApiResponse::ok(script.online.iter().any(|u| u.user_id == user_id)))
    }
}

type Session = ChatSession<MemoryTransport, ScriptedHistory, Arc<StaticIdentity>>;

fn signed_in() -> StaticIdentity {
    StaticIdentity::new(User::new(ME, "me"), SecretString::from("s3cret"))
}

fn session_with(identity: StaticIdentity) -> (Session, MemoryBroker, ScriptedHistory) {
    session_sharing(Arc::new(identity))
}

fn session_sharing(identity: Arc<StaticIdentity>) -> (Session, MemoryBroker, ScriptedHistory) {
    let (transport, broker) = MemoryTransport::new(CAPACITY);
    let history = ScriptedHistory::default();
    let config =
        SessionConfig { channel_capacity: CAPACITY, ..SessionConfig::new("memory://chat") };
    (ChatSession::new(config, transport, history.clone(), identity), broker, history)
}

/// Connect, answer the handshake and drain the setup frames.
async fn connect(session: &mut Session, broker: &mut MemoryBroker) -> (MemoryPeer, Vec<Frame>) {
    let (result, mut peer) = tokio::join!(session.connect(), async {
        let mut peer = broker.accept().await.unwrap();
        peer.accept_handshake().await.unwrap();
        peer
    });
    result.unwrap();

    let setup = peer.recv_many(4).await;
    (peer, setup)
}

async fn connected() -> (Session, MemoryBroker, MemoryPeer, ScriptedHistory) {
    let (mut session, mut broker, history) = session_with(signed_in());
    let (peer, _) = connect(&mut session, &mut broker).await;
    (session, broker, peer, history)
}

fn message(id: i64, sender: UserId, receiver: Option<UserId>) -> String {
    let wire = WireMessage {
        id: Some(id),
        content: format!("message {id}"),
        sender_id: Some(sender),
        receiver_id: receiver,
        ..Default::default()
    };
    serde_json::to_string(&wire).unwrap()
}

fn wire(id: i64, sender: UserId) -> WireMessage {
    WireMessage { id: Some(id), sender_id: Some(sender), ..Default::default() }
}

fn public_ids(session: &Session) -> Vec<i64> {
    session.chat().store().public().iter().filter_map(|m| m.id()).collect()
}

#[tokio::test]
async fn connect_authenticates_joins_and_subscribes() {
    let (mut session, mut broker, _) = session_with(signed_in());

    let (result, (mut peer, connect_frame)) = tokio::join!(session.connect(), async {
        let mut peer = broker.accept().await.unwrap();
        let connect = peer.accept_handshake().await.unwrap();
        (peer, connect)
    });
    result.unwrap();

    assert_eq!(connect_frame.header("Authorization"), Some("Bearer s3cret"));
    assert_eq!(peer.endpoint, "memory://chat");
    assert_eq!(session.state(), ConnectionState::Connected);

    let setup = peer.recv_many(4).await;
    assert_eq!(setup[0].command, Command::Send);
    assert_eq!(setup[0].header("destination"), Some("/app/chat.join"));
    let subscribed: Vec<_> = setup[1..]
        .iter()
        .inspect(|f| assert_eq!(f.command, Command::Subscribe))
        .filter_map(|f| f.header("destination"))
        .collect();
    assert_eq!(subscribed, vec!["/topic/public", "/user/queue/private", "/topic/users"]);
}

#[tokio::test]
async fn connect_while_connected_is_a_noop() {
    let (mut session, mut broker, mut peer, _) = connected().await;

    session.connect().await.unwrap();

    assert_eq!(session.state(), ConnectionState::Connected);
    assert!(broker.try_accept().is_none());
    assert!(peer.from_client.try_recv().is_err());
}

#[tokio::test]
async fn unauthenticated_connect_is_refused() {
    let (mut session, mut broker, _) = session_with(StaticIdentity::anonymous());

    let err = session.connect().await.unwrap_err();

    assert_eq!(err, ChatError::AuthRequired);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.status_message().is_some());
    assert!(broker.try_accept().is_none());
}

#[tokio::test]
async fn broker_error_fails_handshake() {
    let (mut session, mut broker, _) = session_with(signed_in());

    let (result, _peer) = tokio::join!(session.connect(), async {
        let mut peer = broker.accept().await.unwrap();
        peer.reject_handshake("invalid token").await.unwrap();
        peer
    });

    assert_eq!(result, Err(ChatError::HandshakeFailed("invalid token".into())));
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(session.status_message(), Some("handshake failed: invalid token"));
}

#[tokio::test(start_paused = true)]
async fn silent_broker_times_out() {
    let (mut session, mut broker, _) = session_with(signed_in());

    let started = tokio::time::Instant::now();
    let (result, _peer) = tokio::join!(session.connect(), async {
        let mut peer = broker.accept().await.unwrap();
        peer.recv().await.unwrap();
        peer
    });

    assert!(matches!(result, Err(ChatError::HandshakeFailed(_))));
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn unreachable_broker_fails_handshake() {
    let (mut session, broker, _) = session_with(signed_in());
    drop(broker);

    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, ChatError::HandshakeFailed(_)));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn disconnect_clears_state_and_reconnect_resubscribes() {
    let (mut session, mut broker, mut peer, _) = connected().await;
    session.start_private_chat(3);
    peer.deliver(Channel::Public, message(1, 2, None)).await;
    session.next_event().await.unwrap();

    session.disconnect();

    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(peer.recv().await.map(|f| f.command), Some(Command::Disconnect));
    assert!(peer.recv().await.is_none());
    assert!(session.chat().store().public().is_empty());
    assert_eq!(session.chat().store().list_private().count(), 0);
    assert_eq!(session.chat().active_private(), None);
    assert!(session.next_event().await.is_none());

    let (_peer, setup) = connect(&mut session, &mut broker).await;
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(setup.iter().filter(|f| f.command == Command::Subscribe).count(), 3);
}

#[tokio::test]
async fn ownership_is_fixed_when_a_message_arrives() {
    let identity = Arc::new(signed_in());
    let (mut session, mut broker, _) = session_sharing(Arc::clone(&identity));
    let (mut peer, _) = connect(&mut session, &mut broker).await;

    peer.deliver(Channel::Public, message(1, ME, None)).await;
    session.next_event().await;

    identity.sign_in(User::new(2, "two"), SecretString::from("other"));
    peer.deliver(Channel::Public, message(2, 2, None)).await;
    session.next_event().await;

    let own: Vec<_> = session.chat().store().public().iter().map(|m| m.is_own()).collect();
    assert_eq!(own, vec![true, true]);

    peer.deliver(Channel::Public, message(3, ME, None)).await;
    session.next_event().await;
    assert!(session.chat().store().public()[0].is_own());
    assert!(!session.chat().store().public()[2].is_own());
}

#[tokio::test]
async fn public_log_keeps_latest_hundred() {
    let (mut session, _broker, mut peer, _) = connected().await;

    for id in 1..=101 {
        assert!(peer.deliver(Channel::Public, message(id, 2, None)).await);
        let event = session.next_event().await;
        assert_eq!(event, Some(SessionEvent::Routed(Routed::Public)));
    }

    assert_eq!(public_ids(&session), (2..=101).collect::<Vec<_>>());
}

#[tokio::test]
async fn private_frame_for_inactive_peer_counts_unread() {
    let (mut session, _broker, mut peer, _) = connected().await;
    session.start_private_chat(3);

    peer.deliver(Channel::Private, message(10, 7, Some(ME))).await;
    let event = session.next_event().await;

    assert_eq!(event, Some(SessionEvent::Routed(Routed::Private { peer_id: 7 })));
    assert_eq!(session.chat().store().get_private(7).unread, 1);
    assert_eq!(session.chat().store().get_private(3).unread, 0);
}

#[tokio::test]
async fn public_unread_counts_only_off_chat_view() {
    let (mut session, _broker, mut peer, _) = connected().await;

    peer.deliver(Channel::Public, message(1, 2, None)).await;
    session.next_event().await;
    assert_eq!(session.chat().unread(), 0);

    session.set_view(View::Other);
    peer.deliver(Channel::Public, message(2, 2, None)).await;
    session.next_event().await;
    assert_eq!(session.chat().unread(), 1);

    session.clear_unread();
    assert_eq!(session.chat().unread(), 0);
}

#[tokio::test]
async fn presence_frame_excludes_self_and_tags_threads() {
    let (mut session, _broker, mut peer, _) = connected().await;
    peer.deliver(Channel::Private, message(1, 9, Some(ME))).await;
    session.next_event().await;

    peer.deliver(Channel::Presence, r#"[{"userId":1},{"userId":9,"nickname":"Nine"}]"#).await;
    let event = session.next_event().await;

    assert_eq!(event, Some(SessionEvent::Routed(Routed::Presence { online: 1 })));
    let roster: Vec<_> = session.chat().presence().current().iter().map(|u| u.user_id).collect();
    assert_eq!(roster, vec![9]);
    assert_eq!(session.chat().store().get_private(9).title(), "Nine");
}

#[tokio::test]
async fn undecodable_and_error_frames_do_not_end_the_session() {
    let (mut session, _broker, mut peer, _) = connected().await;

    peer.send(Frame::new(Command::Error).with_header("message", "slow down")).await;
    peer.deliver(Channel::Public, "{not json").await;
    assert_eq!(session.next_event().await, Some(SessionEvent::Skipped(Channel::Public)));

    peer.deliver(Channel::Public, message(5, 2, None)).await;
    assert_eq!(session.next_event().await, Some(SessionEvent::Routed(Routed::Public)));
    assert_eq!(session.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn sends_require_connection() {
    let (mut session, _broker, _) = session_with(signed_in());

    assert_eq!(session.send_public("hi"), Err(ChatError::NotConnected));
    assert_eq!(session.send_private(3, "hi"), Err(ChatError::NotConnected));
    assert_eq!(session.status_message(), Some("not connected"));
}

#[tokio::test]
async fn sends_trimmed_content_and_skips_blank() {
    let (mut session, _broker, mut peer, _) = connected().await;

    session.send_public("   ").unwrap();
    session.send_public("  hello all ").unwrap();
    session.send_private(4, " psst ").unwrap();

    let frames = peer.recv_many(2).await;
    assert_eq!(frames[0].header("destination"), Some("/app/chat.sendMessage"));
    assert_eq!(frames[0].body, r#"{"content":"hello all"}"#);
    assert_eq!(frames[1].header("destination"), Some("/app/chat.sendPrivate"));
    assert_eq!(frames[1].body, r#"{"content":"psst","receiverId":4}"#);
    assert!(session.chat().store().private(4).is_some());
}

#[tokio::test]
async fn send_after_broker_hangs_up_fails() {
    let (mut session, _broker, peer, _) = connected().await;
    drop(peer);

    let err = session.send_public("anyone?").unwrap_err();
    assert!(matches!(err, ChatError::SendFailed(_)));
    assert!(session.status_message().is_some_and(|s| s.starts_with("send failed")));
}

#[tokio::test]
async fn lost_connection_keeps_conversations() {
    let (mut session, _broker, mut peer, _) = connected().await;
    peer.deliver(Channel::Public, message(1, 2, None)).await;
    session.next_event().await;

    drop(peer);

    assert_eq!(session.next_event().await, Some(SessionEvent::ConnectionLost));
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(public_ids(&session), vec![1]);
    assert_eq!(session.status_message(), Some("Connection lost"));
}

#[tokio::test]
async fn public_history_replaces_log() {
    let (mut session, _broker, mut peer, history) = connected().await;
    peer.deliver(Channel::Public, message(99, 2, None)).await;
    session.next_event().await;

    history.edit(|s| {
        s.public = (1..=15).map(|id| wire(id, if id % 3 == 0 { ME } else { 2 })).collect();
    });
    let stored = session.load_public_history(Some(20)).await.unwrap();

    assert_eq!(stored, 15);
    assert_eq!(public_ids(&session), (1..=15).collect::<Vec<_>>());
    for m in session.chat().store().public() {
        assert_eq!(m.is_own(), m.sender_id() == Some(ME));
    }
}

#[tokio::test]
async fn history_uses_configured_default_limit() {
    let (mut session, _broker, history) = session_with(signed_in());

    session.load_public_history(None).await.unwrap();
    session.load_private_history(3, Some(5)).await.unwrap();

    assert_eq!(history.0.lock().unwrap().requested_limits, vec![20, 5]);
}

#[tokio::test]
async fn failed_history_is_silent_and_harmless() {
    let (mut session, _broker, mut peer, history) = connected().await;
    peer.deliver(Channel::Public, message(7, 2, None)).await;
    session.next_event().await;
    history.edit(|s| s.failing = true);

    let err = session.load_public_history(Some(20)).await.unwrap_err();

    assert!(matches!(err, ChatError::HistoryFetchFailed(_)));
    assert_eq!(public_ids(&session), vec![7]);
    assert_eq!(session.status_message(), None);
}

#[tokio::test]
async fn private_history_creates_thread_with_presence() {
    let (mut session, _broker, mut peer, history) = connected().await;
    peer.deliver(Channel::Presence, r#"[{"userId":5,"username":"five"}]"#).await;
    session.next_event().await;
    history.edit(|s| {
        s.private.insert(5, vec![wire(1, 5), wire(2, ME)]);
    });

    let stored = session.load_private_history(5, None).await.unwrap();

    assert_eq!(stored, 2);
    let thread = session.chat().store().get_private(5);
    assert_eq!(thread.title(), "five");
    assert_eq!(thread.unread, 0);
    assert!(thread.messages()[1].is_own());
}

#[tokio::test]
async fn refresh_presence_replaces_roster() {
    let (mut session, _broker, history) = session_with(signed_in());
    history.edit(|s| s.online = vec![OnlineUser::new(ME), OnlineUser::new(4), OnlineUser::new(6)]);

    let online = session.refresh_presence().await.unwrap();

    assert_eq!(online, 2);
    assert!(session.chat().presence().is_online(4));
    assert!(!session.chat().presence().is_online(ME));

    history.edit(|s| s.failing = true);
    assert!(matches!(session.refresh_presence().await, Err(ChatError::HistoryFetchFailed(_))));
    assert_eq!(session.chat().presence().current().len(), 2);
}

#[tokio::test]
async fn check_online_leaves_roster_alone() {
    let (session, _broker, history) = session_with(signed_in());
    history.edit(|s| s.online = vec![OnlineUser::new(4)]);

    assert_eq!(session.check_online(4).await, Ok(true));
    assert_eq!(session.check_online(5).await, Ok(false));
    assert!(session.chat().presence().current().is_empty());

    history.edit(|s| s.failing = true);
    assert!(matches!(session.check_online(4).await, Err(ChatError::HistoryFetchFailed(_))));
    assert_eq!(session.status_message(), None);
}
