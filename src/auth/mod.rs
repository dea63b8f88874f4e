//! Session and refresh-token management.
//!
//! Refresh tokens are opaque 128-char hex strings held only in memory;
//! a restart logs everyone out. Session tokens are short-lived sealed
//! claims (see `tokens`) issued against a refresh token. Both lookup
//! maps sit behind one mutex so login, refresh, and logout serialize
//! per process and cannot lose concurrent updates to the same token.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use aes_gcm::Aes256Gcm;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::AuthConfig;
use crate::db::{Store, repositories};

pub mod keys;
pub mod tokens;

pub use keys::SessionKey;
pub use tokens::SessionClaims;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid Username")]
    InvalidUsername,

    #[error("Invalid Password")]
    InvalidPassword,

    #[error("Refresh Token not found on server")]
    TokenNotFound,

    #[error("Refresh Token does not belong to this user")]
    TokenMismatch,

    #[error("Session token is invalid or expired")]
    SessionInvalid,

    #[error("Database failure: {0}")]
    Database(String),

    #[error("Internal failure: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this is a caller problem (401) rather than a server one.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::InvalidUsername
                | Self::InvalidPassword
                | Self::TokenNotFound
                | Self::TokenMismatch
                | Self::SessionInvalid
        )
    }
}

struct RefreshEntry {
    user_id: i32,
    expires_at: DateTime<Utc>,
}

/// token -> entry plus a user-id index over the same tokens, kept in
/// lockstep so global logout never scans.
#[derive(Default)]
struct TokenTable {
    by_token: HashMap<String, RefreshEntry>,
    by_user: HashMap<i32, HashSet<String>>,
}

impl TokenTable {
    fn insert(&mut self, token: String, user_id: i32, expires_at: DateTime<Utc>) {
        self.by_user
            .entry(user_id)
            .or_default()
            .insert(token.clone());
        self.by_token
            .insert(token, RefreshEntry { user_id, expires_at });
    }

    fn remove(&mut self, token: &str) -> Option<RefreshEntry> {
        let entry = self.by_token.remove(token)?;
        if let Some(set) = self.by_user.get_mut(&entry.user_id) {
            set.remove(token);
            if set.is_empty() {
                self.by_user.remove(&entry.user_id);
            }
        }
        Some(entry)
    }

    fn remove_all(&mut self, user_id: i32) -> usize {
        let Some(set) = self.by_user.remove(&user_id) else {
            return 0;
        };
        let count = set.len();
        for token in set {
            self.by_token.remove(&token);
        }
        count
    }
}

pub struct SessionManager {
    store: Store,
    cipher: Aes256Gcm,
    issuer: String,
    audience: String,
    session_ttl: Duration,
    refresh_ttl: Duration,
    tokens: Mutex<TokenTable>,
}

impl SessionManager {
    /// Loads (or creates) the session key and builds the manager. Part
    /// of startup; key-file problems abort here.
    pub fn new(store: Store, config: &AuthConfig) -> Result<Self> {
        let key = SessionKey::load_or_generate(Path::new(&config.key_path))?;

        Ok(Self {
            store,
            cipher: key.cipher(),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            session_ttl: Duration::minutes(config.session_ttl_minutes),
            refresh_ttl: Duration::hours(config.refresh_ttl_hours),
            tokens: Mutex::new(TokenTable::default()),
        })
    }

    /// Verifies credentials and issues a fresh refresh token. The two
    /// failure modes stay distinct so the service layer can log them
    /// apart, but both render as 401 upstream.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .store
            .get_user_by_username(username)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::InvalidUsername)?;

        let verified = repositories::user::verify_password(user.password_hash, password.to_string())
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !verified {
            return Err(AuthError::InvalidPassword);
        }

        let token = generate_refresh_token();
        let expires_at = Utc::now() + self.refresh_ttl;

        let mut table = self.tokens.lock().await;
        table.insert(token.clone(), user.id, expires_at);
        Ok(token)
    }

    /// Exchanges a live refresh token for a sealed session token.
    /// Expired entries are dropped on the way and report the same
    /// not-found failure as never-issued tokens.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let user_id = {
            let mut table = self.tokens.lock().await;
            let entry = table
                .by_token
                .get(refresh_token)
                .ok_or(AuthError::TokenNotFound)?;
            let user_id = entry.user_id;

            if entry.expires_at <= Utc::now() {
                table.remove(refresh_token);
                return Err(AuthError::TokenNotFound);
            }
            user_id
        };

        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.session_ttl).timestamp(),
        };

        tokens::seal(&self.cipher, &claims).map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Validates a session token and returns the user id it vouches
    /// for. Every failure collapses into `SessionInvalid`.
    pub fn authorize(&self, session_token: &str) -> Result<i32, AuthError> {
        let claims =
            tokens::open(&self.cipher, session_token).map_err(|_| AuthError::SessionInvalid)?;

        if claims.iss != self.issuer || claims.aud != self.audience {
            return Err(AuthError::SessionInvalid);
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::SessionInvalid);
        }

        Ok(claims.sub)
    }

    /// Removes one refresh token, or with `global` every token the user
    /// holds. The token must exist and belong to `user_id`.
    pub async fn logout(
        &self,
        user_id: i32,
        refresh_token: &str,
        global: bool,
    ) -> Result<(), AuthError> {
        let mut table = self.tokens.lock().await;

        let entry = table
            .by_token
            .get(refresh_token)
            .ok_or(AuthError::TokenNotFound)?;
        if entry.user_id != user_id {
            return Err(AuthError::TokenMismatch);
        }

        if global {
            table.remove_all(user_id);
        } else {
            table.remove(refresh_token);
        }
        Ok(())
    }

    /// Drops every refresh token of a user without requiring one in
    /// hand. Used when an account is deleted.
    pub async fn revoke_all(&self, user_id: i32) -> usize {
        self.tokens.lock().await.remove_all(user_id)
    }

    /// Live refresh-token count, surfaced by the status endpoint.
    pub async fn active_refresh_tokens(&self) -> usize {
        self.tokens.lock().await.by_token.len()
    }
}

/// Generate a refresh token: 64 random bytes as a 128-char hex string.
fn generate_refresh_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 64] = rng.random();

    bytes.iter().fold(String::with_capacity(128), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
