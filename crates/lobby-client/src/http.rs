//! REST history over HTTP.
//!
//! Every request carries the identity's bearer token. Non-success statuses
//! are errors; a success status with `success == false` in the envelope is
//! passed through for the session to interpret.

use std::sync::Arc;

use lobby_core::IdentityProvider;
use lobby_proto::{ApiResponse, OnlineUser, UserId};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::HistoryError,
    history::{HistorySource, MessagePage},
};

/// Largest page the server will return.
pub const MAX_PAGE: usize = 100;

/// History source backed by the chat REST API.
#[derive(Clone)]
pub struct HttpHistory {
    client: reqwest::Client,
    base_url: String,
    identity: Arc<dyn IdentityProvider>,
}

impl HttpHistory {
    /// Source for the API rooted at `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>, identity: Arc<dyn IdentityProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client: reqwest::Client::new(), base_url, identity }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, HistoryError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "fetching");

        let mut request = self.client.get(&url).query(query);
        if let Some(token) = self.identity.credential() {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| HistoryError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HistoryError::Status(status.as_u16()));
        }

        response.json().await.map_err(|e| HistoryError::Decode(e.to_string()))
    }
}

impl HistorySource for HttpHistory {
    async fn fetch_public(&self, limit: usize) -> Result<MessagePage, HistoryError> {
        let limit = limit.min(MAX_PAGE).to_string();
        self.get("/api/chat/public/messages", &[("limit", limit)]).await
    }

    async fn fetch_private(
        &self,
        peer_id: UserId,
        limit: usize,
    ) -> Result<MessagePage, HistoryError> {
        let limit = limit.min(MAX_PAGE).to_string();
        self.get(&format!("/api/chat/private/messages/{peer_id}"), &[("limit", limit)]).await
    }

    async fn fetch_online_users(&self) -> Result<ApiResponse<Vec<OnlineUser>>, HistoryError> {
        self.get("/api/chat/online-users", &[]).await
    }

    async fn check_online(&self, user_id: UserId) -> Result<ApiResponse<bool>, HistoryError> {
        self.get(&format!("/api/chat/user/{user_id}/online"), &[]).await
    }
}
