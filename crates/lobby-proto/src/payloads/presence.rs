//! Online roster payloads.

use serde::{Deserialize, Serialize};

use super::{UserId, WireTimestamp};

/// Self-reported availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceStatus {
    /// Available.
    Online,
    /// Idle.
    Away,
    /// Do not disturb.
    Busy,
    /// Signed off but still listed.
    Offline,
}

/// One entry of the online roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUser {
    /// User id.
    pub user_id: UserId,
    /// Login name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Display nickname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Broker session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Availability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceStatus>,
    /// Last activity seen by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_time: Option<WireTimestamp>,
    /// Login time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_time: Option<WireTimestamp>,
    /// Room the user is in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
}

impl OnlineUser {
    /// Roster entry with only an id.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            username: None,
            nickname: None,
            session_id: None,
            status: None,
            last_active_time: None,
            login_time: None,
            room_id: None,
        }
    }

    /// Name to show: nickname, then username, then a generic label.
    pub fn display_name(&self) -> String {
        self.nickname
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.username.as_deref().filter(|name| !name.is_empty()))
            .map_or_else(|| format!("User {}", self.user_id), str::to_string)
    }
}
