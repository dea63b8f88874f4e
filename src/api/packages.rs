use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::AuthedUser;
use super::validation::{validate_package_id, validate_user_id};
use super::{ApiError, ApiResponse, AppState};
use crate::services::package_service::{
    NewPackage, PackageDto, PackageServiceError, PackageUpdate,
};

impl From<PackageServiceError> for ApiError {
    fn from(err: PackageServiceError) -> Self {
        match err {
            PackageServiceError::NotFound => Self::NotFound(err.to_string()),
            PackageServiceError::Validation(msg) => Self::ValidationError(msg),
            PackageServiceError::Unauthorized => Self::Unauthorized(err.to_string()),
            PackageServiceError::Conflict(msg) => Self::Conflict(msg),
            PackageServiceError::Database(msg) => Self::DatabaseError(msg),
            PackageServiceError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

#[derive(Deserialize)]
pub struct PackageQuery {
    pub package_id: Option<i32>,
    pub user_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct PackageIdQuery {
    pub package_id: i32,
}

#[derive(Deserialize)]
pub struct UpdatePackageRequest {
    pub package_id: i32,
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub markdown: Option<String>,
}

/// GET /packages?package_id=N or /packages?user_id=N
/// One package by id, or every package a user owns.
pub async fn get_packages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackageQuery>,
) -> Result<Response, ApiError> {
    if let Some(package_id) = query.package_id {
        let package_id = validate_package_id(package_id)?;
        let package = state.package_service().get_package(package_id).await?;
        return Ok(Json(ApiResponse::success(package)).into_response());
    }

    if let Some(user_id) = query.user_id {
        let user_id = validate_user_id(user_id)?;
        let packages = state
            .package_service()
            .list_packages_for_user(user_id)
            .await?;
        return Ok(Json(ApiResponse::success(packages)).into_response());
    }

    Err(ApiError::validation("package_id or user_id is required"))
}

/// POST /packages
/// Register a package owned by the caller. Replies 201 with a Location
/// header pointing at the new resource.
pub async fn create_package(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(payload): Json<NewPackage>,
) -> Result<Response, ApiError> {
    let created: PackageDto = state
        .package_service()
        .create_package(auth.id, payload)
        .await?;

    let location = format!("/api/packages?package_id={}", created.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponse::success(created)),
    )
        .into_response())
}

/// PATCH /packages
/// Change package fields; only the owner may.
pub async fn update_package(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Json(payload): Json<UpdatePackageRequest>,
) -> Result<Json<ApiResponse<PackageDto>>, ApiError> {
    let package_id = validate_package_id(payload.package_id)?;

    if payload.name.is_none()
        && payload.category.is_none()
        && payload.description.is_none()
        && payload.input.is_none()
        && payload.output.is_none()
        && payload.markdown.is_none()
    {
        return Err(ApiError::validation("No fields to update"));
    }

    let update = PackageUpdate {
        name: payload.name,
        category: payload.category,
        description: payload.description,
        input: payload.input,
        output: payload.output,
        markdown: payload.markdown,
    };

    let package = state
        .package_service()
        .update_package(auth.id, package_id, update)
        .await?;

    Ok(Json(ApiResponse::success(package)))
}

/// DELETE /packages?package_id=N
/// Remove a package; only the owner may.
pub async fn delete_package(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthedUser>,
    Query(query): Query<PackageIdQuery>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let package_id = validate_package_id(query.package_id)?;

    state
        .package_service()
        .delete_package(auth.id, package_id)
        .await?;

    Ok(Json(ApiResponse::success(true)))
}
