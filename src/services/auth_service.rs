//! Domain service for authentication: login, session issuance, logout.
//!
//! Thin orchestration over `auth::SessionManager` that adds event
//! publishing; the error type is the manager's own.

use serde::Serialize;

pub use crate::auth::AuthError;

/// Result of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    /// Opaque 128-char hex refresh token.
    pub refresh_token: String,
}

/// Result of a successful refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    /// Sealed session token, valid for the configured session TTL.
    pub session_token: String,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidUsername`] for an unknown user and
    /// [`AuthError::InvalidPassword`] for a bad password.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Exchanges a refresh token for a short-lived session token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenNotFound`] when the refresh token is
    /// unknown or expired.
    async fn refresh(&self, refresh_token: &str) -> Result<SessionResult, AuthError>;

    /// Validates a session token and returns the user id it belongs to.
    fn authorize(&self, session_token: &str) -> Result<i32, AuthError>;

    /// Invalidates one refresh token, or all of the user's with `global`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenNotFound`] for an unknown token and
    /// [`AuthError::TokenMismatch`] when the token belongs to someone else.
    async fn logout(
        &self,
        user_id: i32,
        refresh_token: &str,
        global: bool,
    ) -> Result<(), AuthError>;

    /// Resolves an API key to the owning user id, if any.
    async fn authenticate_api_key(&self, api_key: &str) -> Result<Option<i32>, AuthError>;
}
