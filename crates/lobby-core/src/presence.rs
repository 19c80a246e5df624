//! Online roster.
//!
//! The broker broadcasts the full roster on every change, so updates replace
//! the list rather than merging into it.

use lobby_proto::{OnlineUser, UserId};

/// Online users other than the current user.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    users: Vec<OnlineUser>,
}

impl PresenceTracker {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster, dropping the current user's own entry.
    pub fn update(&mut self, users: Vec<OnlineUser>, current_user: Option<UserId>) {
        self.users = users.into_iter().filter(|user| Some(user.user_id) != current_user).collect();
    }

    /// Current roster, in broker order.
    pub fn current(&self) -> &[OnlineUser] {
        &self.users
    }

    /// Whether `user_id` is on the roster.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.get(user_id).is_some()
    }

    /// Roster entry for `user_id`.
    pub fn get(&self, user_id: UserId) -> Option<&OnlineUser> {
        self.users.iter().find(|user| user.user_id == user_id)
    }

    /// Forget everyone.
    pub fn clear(&mut self) {
        self.users.clear();
    }
}
