//! Bounded conversation storage.
//!
//! # Invariants
//!
//! - The public log never holds more than [`PUBLIC_CAPACITY`] messages and a
//!   private thread never more than [`PRIVATE_CAPACITY`].
//! - Truncation drops a contiguous oldest prefix; order is never changed.
//! - A thread's `peer` metadata is never removed once set, short of
//!   [`ConversationStore::clear`].

use std::{
    borrow::Cow,
    collections::{BTreeMap, VecDeque},
};

use lobby_proto::{OnlineUser, UserId};

use crate::message::ChatMessage;

/// Most recent public messages kept.
pub const PUBLIC_CAPACITY: usize = 100;

/// Most recent messages kept per private thread.
pub const PRIVATE_CAPACITY: usize = 50;

/// One-to-one thread keyed by the other participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateConversation {
    /// The other participant.
    pub peer_id: UserId,
    /// Unread messages since the thread was last active.
    pub unread: u32,
    /// Presence metadata, once seen.
    pub peer: Option<OnlineUser>,
    messages: VecDeque<ChatMessage>,
}

impl PrivateConversation {
    /// Empty thread with `peer_id`.
    pub fn new(peer_id: UserId) -> Self {
        Self { peer_id, unread: 0, peer: None, messages: VecDeque::new() }
    }

    /// Messages, oldest first.
    pub fn messages(&self) -> &VecDeque<ChatMessage> {
        &self.messages
    }

    /// Name to show for the peer.
    pub fn title(&self) -> String {
        self.peer
            .as_ref()
            .map_or_else(|| format!("User {}", self.peer_id), OnlineUser::display_name)
    }

    fn push(&mut self, message: ChatMessage) {
        push_bounded(&mut self.messages, message, PRIVATE_CAPACITY);
    }
}

/// Public log plus private threads.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    public: VecDeque<ChatMessage>,
    private: BTreeMap<UserId, PrivateConversation>,
}

impl ConversationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Public messages, oldest first.
    pub fn public(&self) -> &VecDeque<ChatMessage> {
        &self.public
    }

    /// Append to the public log, evicting the oldest entry when full.
    pub fn append_public(&mut self, message: ChatMessage) {
        push_bounded(&mut self.public, message, PUBLIC_CAPACITY);
    }

    /// Append to the thread with `peer_id`, creating it if needed.
    pub fn append_private(
        &mut self,
        peer_id: UserId,
        message: ChatMessage,
    ) -> &mut PrivateConversation {
        let conversation = self.ensure_private(peer_id);
        conversation.push(message);
        conversation
    }

    /// Thread with `peer_id`, or an empty default if none exists yet.
    pub fn get_private(&self, peer_id: UserId) -> Cow<'_, PrivateConversation> {
        self.private
            .get(&peer_id)
            .map_or_else(|| Cow::Owned(PrivateConversation::new(peer_id)), Cow::Borrowed)
    }

    /// Existing thread with `peer_id`.
    pub fn private(&self, peer_id: UserId) -> Option<&PrivateConversation> {
        self.private.get(&peer_id)
    }

    /// Thread with `peer_id`, created empty if missing.
    pub fn ensure_private(&mut self, peer_id: UserId) -> &mut PrivateConversation {
        self.private.entry(peer_id).or_insert_with(|| PrivateConversation::new(peer_id))
    }

    /// All threads, ordered by peer id.
    pub fn list_private(&self) -> impl Iterator<Item = (UserId, &PrivateConversation)> {
        self.private.iter().map(|(peer_id, conversation)| (*peer_id, conversation))
    }

    /// All threads, mutably.
    pub fn private_threads_mut(&mut self) -> impl Iterator<Item = &mut PrivateConversation> {
        self.private.values_mut()
    }

    /// Replace the public log, keeping the most recent entries.
    pub fn replace_public(&mut self, messages: Vec<ChatMessage>) {
        self.public = keep_latest(messages, PUBLIC_CAPACITY);
    }

    /// Replace one thread's messages, keeping the most recent entries.
    ///
    /// `unread` and `peer` are left untouched.
    pub fn replace_private(&mut self, peer_id: UserId, messages: Vec<ChatMessage>) {
        self.ensure_private(peer_id).messages = keep_latest(messages, PRIVATE_CAPACITY);
    }

    /// Drop every message and thread.
    pub fn clear(&mut self) {
        self.public.clear();
        self.private.clear();
    }
}

fn push_bounded(log: &mut VecDeque<ChatMessage>, message: ChatMessage, capacity: usize) {
    log.push_back(message);
    while log.len() > capacity {
        log.pop_front();
    }
}

fn keep_latest(mut messages: Vec<ChatMessage>, capacity: usize) -> VecDeque<ChatMessage> {
    let excess = messages.len().saturating_sub(capacity);
    messages.drain(..excess);
    messages.into()
}
