use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::auth_service::{AuthError, LoginResult, SessionResult};

/// Identity of the caller, resolved by [`auth_middleware`] and attached
/// to the request extensions for handlers to extract.
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: i32,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
    #[serde(default)]
    pub global: bool,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_unauthorized() {
            return Self::Unauthorized(err.to_string());
        }
        match err {
            AuthError::Database(msg) => Self::DatabaseError(msg),
            other => Self::InternalError(other.to_string()),
        }
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. `Authorization: Bearer <session token>` header
/// 2. `X-Api-Key` header
///
/// On success the resolved [`AuthedUser`] is inserted into the request
/// extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = bearer_token(&headers)
        && let Ok(user_id) = state.auth_service().authorize(token)
    {
        tracing::Span::current().record("user_id", user_id);
        request.extensions_mut().insert(AuthedUser { id: user_id });
        return Ok(next.run(request).await);
    }

    if let Some(key) = headers.get("X-Api-Key").and_then(|v| v.to_str().ok())
        && let Ok(Some(user_id)) = state.auth_service().authenticate_api_key(key).await
    {
        tracing::Span::current().record("user_id", user_id);
        request.extensions_mut().insert(AuthedUser { id: user_id });
        return Ok(next.run(request).await);
    }

    Err(ApiError::Unauthorized("Unauthorized".to_string()))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Verify credentials and issue a refresh token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResult>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let result = state
        .auth_service()
        .login(&payload.username, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

/// POST /auth/refresh
/// Exchange a refresh token for a short-lived session token.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<SessionResult>>, ApiError> {
    if payload.refresh_token.is_empty() {
        return Err(ApiError::validation("Refresh token is required"));
    }

    let result = state.auth_service().refresh(&payload.refresh_token).await?;

    Ok(Json(ApiResponse::success(result)))
}

/// DELETE /auth/logout
/// Invalidate one refresh token, or all of the caller's with `global`.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    if payload.refresh_token.is_empty() {
        return Err(ApiError::validation("Refresh token is required"));
    }

    state
        .auth_service()
        .logout(auth.id, &payload.refresh_token, payload.global)
        .await?;

    Ok(Json(ApiResponse::success(true)))
}
