//! Plain-text rendering of chat state.

use chrono::Local;
use lobby_client::SessionEvent;
use lobby_core::{ChatMessage, ChatState, Routed};
use lobby_proto::MessageKind;

/// One message as a terminal line.
pub fn message_line(message: &ChatMessage) -> String {
    let time = message.created_at().map_or_else(
        || "--:--".to_string(),
        |at| at.with_timezone(&Local).format("%H:%M").to_string(),
    );

    match message.kind() {
        MessageKind::Text => {
            let sender = match (message.is_own(), message.sender_name(), message.sender_id()) {
                (true, ..) => "you".to_string(),
                (false, Some(name), _) if !name.is_empty() => name.to_string(),
                (false, _, Some(id)) => format!("User {id}"),
                (false, ..) => "unknown".to_string(),
            };
            format!("[{time}] {sender}: {}", message.content())
        },
        MessageKind::System | MessageKind::Join | MessageKind::Leave => {
            format!("[{time}] * {}", message.content())
        },
    }
}

/// Lines to print for a session event, if any.
pub fn event_lines(chat: &ChatState, event: SessionEvent) -> Vec<String> {
    match event {
        SessionEvent::Routed(Routed::Public) => {
            chat.store().public().back().map(message_line).into_iter().collect()
        },
        SessionEvent::Routed(Routed::Private { peer_id }) => {
            let conversation = chat.store().get_private(peer_id);
            conversation
                .messages()
                .back()
                .map(|message| format!("<{}> {}", conversation.title(), message_line(message)))
                .into_iter()
                .collect()
        },
        SessionEvent::Routed(Routed::Presence { online }) => {
            vec![format!("* {online} other user(s) online")]
        },
        SessionEvent::Skipped(_) => Vec::new(),
        SessionEvent::ConnectionLost => vec!["* connection lost".to_string()],
    }
}

/// Online roster, one user per line.
pub fn roster_lines(chat: &ChatState) -> Vec<String> {
    let users = chat.presence().current();
    if users.is_empty() {
        return vec!["* nobody else is online".to_string()];
    }
    users.iter().map(|user| format!("  {:>6}  {}", user.user_id, user.display_name())).collect()
}

/// Private threads with unread counts; the active one is marked.
pub fn thread_lines(chat: &ChatState) -> Vec<String> {
    let lines: Vec<String> = chat
        .store()
        .list_private()
        .map(|(peer_id, conversation)| {
            let marker = if chat.active_private() == Some(peer_id) { '>' } else { ' ' };
            let unread = match conversation.unread {
                0 => String::new(),
                n => format!(" ({n} unread)"),
            };
            format!("{marker} {peer_id:>6}  {}{unread}", conversation.title())
        })
        .collect();

    if lines.is_empty() { vec!["* no private chats".to_string()] } else { lines }
}

/// The active conversation in full, oldest first.
pub fn transcript_lines(chat: &ChatState) -> Vec<String> {
    match chat.active_private() {
        Some(peer_id) => {
            let conversation = chat.store().get_private(peer_id);
            let mut lines = vec![format!("--- {} ---", conversation.title())];
            lines.extend(conversation.messages().iter().map(message_line));
            lines
        },
        None => {
            let mut lines = vec!["--- public ---".to_string()];
            lines.extend(chat.store().public().iter().map(message_line));
            lines
        },
    }
}
