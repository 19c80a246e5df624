//! Current user and bearer credential.
//!
//! The session never reads credentials from ambient storage; an
//! [`IdentityProvider`] is injected when the session is built.

use std::sync::{Arc, PoisonError, RwLock};

use lobby_proto::UserId;
use secrecy::{ExposeSecret, SecretString};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Server-assigned id.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Display nickname.
    pub nickname: Option<String>,
}

impl User {
    /// User with no nickname.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self { id, username: username.into(), nickname: None }
    }
}

/// Source of the current user and their bearer token.
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;

    /// Bearer token, if any.
    fn credential(&self) -> Option<SecretString>;

    /// Signed in means both a user and a token are present.
    fn is_authenticated(&self) -> bool {
        self.current_user().is_some() && self.credential().is_some()
    }
}

impl<T: IdentityProvider + ?Sized> IdentityProvider for Arc<T> {
    fn current_user(&self) -> Option<User> {
        (**self).current_user()
    }

    fn credential(&self) -> Option<SecretString> {
        (**self).credential()
    }

    fn is_authenticated(&self) -> bool {
        (**self).is_authenticated()
    }
}

#[derive(Debug, Default)]
struct Signed {
    user: Option<User>,
    token: Option<SecretString>,
}

/// In-process identity that can be signed in and out.
///
/// The token is only handed out wrapped in [`SecretString`] so it does not
/// end up in `Debug` output or logs.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    inner: RwLock<Signed>,
}

impl StaticIdentity {
    /// Identity signed in as `user` with `token`.
    pub fn new(user: User, token: SecretString) -> Self {
        let identity = Self::anonymous();
        identity.sign_in(user, token);
        identity
    }

    /// Identity with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replace the signed-in user and token.
    pub fn sign_in(&self, user: User, token: SecretString) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.user = Some(user);
        inner.token = Some(token);
    }

    /// Forget the user and token.
    pub fn sign_out(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = Signed::default();
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<User> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).user.clone()
    }

    fn credential(&self) -> Option<SecretString> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.token.as_ref().map(|token| SecretString::from(token.expose_secret()))
    }
}
