//! Identity provider: sign-up and sign-in against the hosted auth service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use salon_shared::UserId;

use crate::error::AuthError;

/// Credentials submitted by the auth form.
///
/// `username` is only meaningful on sign-up, where it seeds the profile row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
}

/// The authenticated identity returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    /// Stable identifier assigned by the provider.
    pub id: UserId,
    pub email: String,
    pub username: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, credentials: &Credentials) -> Result<AuthUser, AuthError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthUser, AuthError>;
}
