use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthedUser;
use super::validation::{validate_email, validate_password, validate_user_id, validate_username};
use super::{ApiError, ApiResponse, AppState};
use crate::services::user_service::{UserProfile, UserServiceError, UserUpdate};

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound => Self::NotFound(err.to_string()),
            UserServiceError::Validation(msg) => Self::ValidationError(msg),
            UserServiceError::Unauthorized => Self::Unauthorized(err.to_string()),
            UserServiceError::Conflict(msg) => Self::Conflict(msg),
            UserServiceError::Database(msg) => Self::DatabaseError(msg),
            UserServiceError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub user_id: i32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}

/// POST /users
/// Register a new account. Open to anonymous callers.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    validate_username(&payload.username)?;
    validate_password(&payload.password)?;
    validate_email(&payload.email)?;

    let profile = state
        .user_service()
        .create_user(&payload.username, &payload.password, &payload.email)
        .await?;

    Ok(Json(ApiResponse::success(profile)))
}

/// GET /users?user_id=N
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user_id = validate_user_id(query.user_id)?;
    let profile = state.user_service().get_user(user_id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// GET /users/me
/// The caller's own profile, resolved from the bearer principal.
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let profile = state.user_service().get_user(auth.id).await?;
    Ok(Json(ApiResponse::success(profile)))
}

/// PATCH /users
/// Change account fields; the caller may only modify their own account.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    let user_id = validate_user_id(payload.user_id)?;

    if payload.username.is_none()
        && payload.password.is_none()
        && payload.email.is_none()
        && payload.profile_picture.is_none()
    {
        return Err(ApiError::validation("No fields to update"));
    }

    if let Some(ref username) = payload.username {
        validate_username(username)?;
    }
    if let Some(ref password) = payload.password {
        validate_password(password)?;
    }
    if let Some(ref email) = payload.email {
        validate_email(email)?;
    }

    let update = UserUpdate {
        username: payload.username,
        password: payload.password,
        email: payload.email,
        profile_picture: payload.profile_picture,
    };

    let profile = state
        .user_service()
        .update_user(auth.id, user_id, update)
        .await?;

    Ok(Json(ApiResponse::success(profile)))
}

/// DELETE /users?user_id=N
/// Remove an account; the caller may only delete their own.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Query(query): Query<UserQuery>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let user_id = validate_user_id(query.user_id)?;

    state.user_service().delete_user(auth.id, user_id).await?;

    Ok(Json(ApiResponse::success(true)))
}
