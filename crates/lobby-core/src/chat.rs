//! Observable chat state.
//!
//! [`ChatState`] is the view model a consumer renders from: conversations,
//! presence, the active private thread, which view the consumer is on, the
//! public unread counter and the latest user-visible alert. It is pure; the
//! session feeds it routed frames and history.
//!
//! # Invariants
//!
//! - A thread's `unread` is reset to zero exactly when it becomes active.
//! - The public unread counter only grows while the consumer is away from the
//!   chat view and only shrinks through [`ChatState::clear_unread`].

use lobby_proto::{OnlineUser, UserId};

use crate::{
    message::ChatMessage,
    presence::PresenceTracker,
    store::{ConversationStore, PrivateConversation},
};

/// Which screen the consumer is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// The chat screen.
    #[default]
    Chat,
    /// Anything else.
    Other,
}

/// Conversation, presence and attention state for one session.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    store: ConversationStore,
    presence: PresenceTracker,
    /// Private thread being viewed. `None` means the public room.
    active_private: Option<UserId>,
    view: View,
    /// Public messages received while away from the chat view.
    unread: u32,
    /// Latest user-visible alert.
    status_message: Option<String>,
}

impl ChatState {
    /// Empty state on the chat view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversations.
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Online roster.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Active private thread. `None` if viewing the public room.
    pub fn active_private(&self) -> Option<UserId> {
        self.active_private
    }

    /// Current view.
    pub fn view(&self) -> View {
        self.view
    }

    /// Public unread counter.
    pub fn unread(&self) -> u32 {
        self.unread
    }

    /// Latest user-visible alert.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Record a user-visible alert.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Switch views. Returning to the chat view does not clear the counter.
    pub fn set_view(&mut self, view: View) {
        self.view = view;
    }

    /// Reset the public unread counter.
    pub fn clear_unread(&mut self) {
        self.unread = 0;
    }

    /// Make the thread with `peer_id` active, creating it if needed.
    ///
    /// Idempotent: repeated calls leave the same state.
    pub fn start_private_chat(&mut self, peer_id: UserId) {
        let conversation = self.ensure_conversation(peer_id);
        conversation.unread = 0;
        self.active_private = Some(peer_id);
    }

    /// Return to the public room. The thread is kept.
    pub fn close_private_chat(&mut self) {
        self.active_private = None;
    }

    /// Thread with `peer_id`, created if needed with metadata from presence.
    pub fn ensure_conversation(&mut self, peer_id: UserId) -> &mut PrivateConversation {
        let known = self.presence.get(peer_id).cloned();
        let conversation = self.store.ensure_private(peer_id);
        if conversation.peer.is_none() {
            conversation.peer = known;
        }
        conversation
    }

    /// Append a live public message.
    pub fn receive_public(&mut self, message: ChatMessage) {
        self.store.append_public(message);
        if self.view != View::Chat {
            self.unread = self.unread.saturating_add(1);
        }
    }

    /// Append a live private message exchanged with `peer_id`.
    pub fn receive_private(&mut self, peer_id: UserId, message: ChatMessage) {
        let watching = self.active_private == Some(peer_id) && self.view == View::Chat;
        let conversation = self.ensure_conversation(peer_id);
        if !watching {
            conversation.unread = conversation.unread.saturating_add(1);
        }
        self.store.append_private(peer_id, message);
    }

    /// Replace the roster and refresh peer metadata on known threads.
    pub fn apply_presence(&mut self, users: Vec<OnlineUser>, current_user: Option<UserId>) {
        self.presence.update(users, current_user);

        let presence = &self.presence;
        for conversation in self.store.private_threads_mut() {
            if let Some(user) = presence.get(conversation.peer_id) {
                conversation.peer = Some(user.clone());
            }
        }
    }

    /// Replace the public log with fetched history.
    pub fn replace_public_history(&mut self, messages: Vec<ChatMessage>) {
        self.store.replace_public(messages);
    }

    /// Replace one thread's messages with fetched history.
    pub fn replace_private_history(&mut self, peer_id: UserId, messages: Vec<ChatMessage>) {
        self.ensure_conversation(peer_id);
        self.store.replace_private(peer_id, messages);
    }

    /// Forget everything except the current view.
    pub fn reset(&mut self) {
        self.store.clear();
        self.presence.clear();
        self.active_private = None;
        self.unread = 0;
    }
}
