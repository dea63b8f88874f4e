//! System API endpoints.
//!
//! Status, log access, and log retention live here. Everything reads
//! through [`AppState`] so the handlers stay thin.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::api::types::{LogDto, LogResponse, SystemStatus};

/// Returns system status.
///
/// # Endpoint
/// `GET /api/system/status`
///
/// Aggregates the package and user counts, process uptime, and the
/// number of refresh tokens currently outstanding.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SystemStatus>>, ApiError> {
    let store = state.store();

    let users = store
        .count_users()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    let packages = store
        .count_packages()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
    let active_refresh_tokens = state.sessions().active_refresh_tokens().await;

    let status = SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        users,
        packages,
        active_refresh_tokens,
    };

    Ok(Json(ApiResponse::success(status)))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub level: Option<String>,
    pub event_type: Option<String>,
}

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    50
}

/// Returns persisted audit log entries, newest first.
///
/// # Endpoint
/// `GET /api/system/logs?page=1&page_size=50&level=warn&event_type=login_failed`
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<LogResponse>>, ApiError> {
    let (logs, total_pages) = state
        .store()
        .get_logs(query.page, query.page_size, query.level, query.event_type)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    let response = LogResponse {
        logs: logs.into_iter().map(LogDto::from).collect(),
        total_pages,
    };

    Ok(Json(ApiResponse::success(response)))
}

/// Deletes all persisted audit log entries.
///
/// # Endpoint
/// `DELETE /api/system/logs`
pub async fn clear_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    state
        .store()
        .clear_logs()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(true)))
}
