//! Domain service for user account management.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::RecordError;

/// Domain errors for user operations.
#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RecordError> for UserServiceError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound => Self::NotFound,
            RecordError::Validation(msg) => Self::Validation(msg),
            RecordError::Invariant(msg) => Self::Internal(msg),
            RecordError::Storage(e) => Self::Database(e.to_string()),
        }
    }
}

/// Public view of a user account. Credentials and the API key stay out.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub profile_picture: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields a user may change about their own account. `None` leaves a
/// field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}

/// Domain service trait for user operations.
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    /// Registers a new account and returns its profile.
    ///
    /// # Errors
    ///
    /// - Returns [`UserServiceError::Validation`] on empty or malformed fields
    /// - Returns [`UserServiceError::Conflict`] when the username or email is taken
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserProfile, UserServiceError>;

    /// Fetches a user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`UserServiceError::NotFound`] if no such user exists.
    async fn get_user(&self, user_id: i32) -> Result<UserProfile, UserServiceError>;

    /// Applies the provided changes to a user's account.
    ///
    /// # Errors
    ///
    /// - Returns [`UserServiceError::Unauthorized`] unless `requester_id` is the account owner
    /// - Returns [`UserServiceError::Conflict`] when a new username or email is taken
    async fn update_user(
        &self,
        requester_id: i32,
        user_id: i32,
        update: UserUpdate,
    ) -> Result<UserProfile, UserServiceError>;

    /// Deletes a user's account and revokes every refresh token it holds.
    ///
    /// # Errors
    ///
    /// Returns [`UserServiceError::Unauthorized`] unless `requester_id` is the account owner.
    async fn delete_user(&self, requester_id: i32, user_id: i32) -> Result<(), UserServiceError>;
}
