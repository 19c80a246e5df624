//! History-fetch collaborator.

use std::future::Future;

use lobby_proto::{ApiResponse, OnlineUser, UserId, WireMessage};

use crate::error::HistoryError;

/// Page of messages as returned by the history API.
pub type MessagePage = ApiResponse<Vec<WireMessage>>;

/// Fetches past messages and roster snapshots.
///
/// Implementations return the server's envelope untouched; a
/// `success == false` envelope is not an error at this layer.
pub trait HistorySource: Send + Sync {
    /// Most recent public messages, oldest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an envelope.
    fn fetch_public(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<MessagePage, HistoryError>> + Send;

    /// Most recent messages exchanged with `peer_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an envelope.
    fn fetch_private(
        &self,
        peer_id: UserId,
        limit: usize,
    ) -> impl Future<Output = Result<MessagePage, HistoryError>> + Send;

    /// Online roster snapshot.
    ///
    /// Sources without a roster endpoint report an unsuccessful envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an envelope.
    fn fetch_online_users(
        &self,
    ) -> impl Future<Output = Result<ApiResponse<Vec<OnlineUser>>, HistoryError>> + Send {
        async { Ok(ApiResponse::failed("online users are not available")) }
    }
    /// Whether `user_id` is online right now.
    ///
    /// Sources without a status endpoint report an unsuccessful envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not an envelope.
    fn check_online(
        &self,
        _user_id: UserId,
    ) -> impl Future<Output = Result<ApiResponse<bool>, HistoryError>> + Send {
        async { Ok(ApiResponse::failed("online status is not available")) }
    }
}
