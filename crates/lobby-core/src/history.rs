//! Fetched history application.
//!
//! History replaces what is stored rather than merging: a public fetch swaps
//! the whole public log, a private fetch swaps one thread's messages and leaves
//! its unread counter and peer metadata alone. A failed or empty envelope
//! leaves the state unchanged.

use lobby_proto::{ApiResponse, OnlineUser, UserId, WireMessage};

use crate::{chat::ChatState, error::ChatError, message::ChatMessage};

/// Number of messages requested when the caller does not say.
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Replace the public log. Returns the number of messages stored.
///
/// # Errors
///
/// - `ChatError::HistoryFetchFailed` if the envelope reports failure or
///   carries no data
pub fn apply_public(
    chat: &mut ChatState,
    response: ApiResponse<Vec<WireMessage>>,
    current_user: Option<UserId>,
) -> Result<usize, ChatError> {
    let messages = ingest(response, current_user)?;
    chat.replace_public_history(messages);
    Ok(chat.store().public().len())
}

/// Replace one private thread. Returns the number of messages stored.
///
/// # Errors
///
/// - `ChatError::HistoryFetchFailed` if the envelope reports failure or
///   carries no data
pub fn apply_private(
    chat: &mut ChatState,
    peer_id: UserId,
    response: ApiResponse<Vec<WireMessage>>,
    current_user: Option<UserId>,
) -> Result<usize, ChatError> {
    let messages = ingest(response, current_user)?;
    chat.replace_private_history(peer_id, messages);
    Ok(chat.store().get_private(peer_id).messages().len())
}

/// Replace the roster from a REST snapshot. Returns the number of users online.
///
/// # Errors
///
/// - `ChatError::HistoryFetchFailed` if the envelope reports failure or
///   carries no data
pub fn apply_online_users(
    chat: &mut ChatState,
    response: ApiResponse<Vec<OnlineUser>>,
    current_user: Option<UserId>,
) -> Result<usize, ChatError> {
    let users = unwrap_envelope(response)?;
    chat.apply_presence(users, current_user);
    Ok(chat.presence().current().len())
}

/// Online status of one user from a point lookup.
///
/// Does not touch the roster: the lookup may be for a user the last presence
/// broadcast did not include yet.
///
/// # Errors
///
/// - `ChatError::HistoryFetchFailed` if the envelope reports failure or
///   carries no data
pub fn online_status(response: ApiResponse<bool>) -> Result<bool, ChatError> {
    unwrap_envelope(response)
}

fn ingest(
    response: ApiResponse<Vec<WireMessage>>,
    current_user: Option<UserId>,
) -> Result<Vec<ChatMessage>, ChatError> {
    Ok(unwrap_envelope(response)?
        .into_iter()
        .map(|wire| ChatMessage::from_wire(wire, current_user))
        .collect())
}

fn unwrap_envelope<T>(response: ApiResponse<T>) -> Result<T, ChatError> {
    let reason = response.message.clone().unwrap_or_else(|| "server returned no data".to_string());
    response.into_data().ok_or(ChatError::HistoryFetchFailed(reason))
}
