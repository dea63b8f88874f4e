//! Domain service for package management.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::RecordError;

/// Domain errors for package operations.
#[derive(Debug, Error)]
pub enum PackageServiceError {
    #[error("Package not found")]
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

impl From<RecordError> for PackageServiceError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound => Self::NotFound,
            RecordError::Validation(msg) => Self::Validation(msg),
            RecordError::Invariant(msg) => Self::Internal(msg),
            RecordError::Storage(e) => Self::Database(e.to_string()),
        }
    }
}

/// Wire representation of a package. `category` carries the lowercase
/// name, never the stored ordinal.
#[derive(Debug, Clone, Serialize)]
pub struct PackageDto {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub category: String,
    pub description: String,
    pub input: String,
    pub output: String,
    pub markdown: String,
    pub num_api_calls: i32,
    pub last_updated: String,
    pub flags: Vec<i32>,
}

/// Payload for registering a package.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub category: String,
    pub description: String,
    pub input: String,
    pub output: String,
    pub markdown: Option<String>,
    pub flags: Option<Vec<i32>>,
}

/// Fields an owner may change on a package. `None` leaves a field
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub markdown: Option<String>,
}

/// Domain service trait for package operations.
#[async_trait::async_trait]
pub trait PackageService: Send + Sync {
    /// Registers a new package owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// - Returns [`PackageServiceError::Validation`] on an unknown category or empty fields
    /// - Returns [`PackageServiceError::Conflict`] when the name is taken
    async fn create_package(
        &self,
        owner_id: i32,
        new: NewPackage,
    ) -> Result<PackageDto, PackageServiceError>;

    /// Fetches one package with its flags.
    ///
    /// # Errors
    ///
    /// Returns [`PackageServiceError::NotFound`] if no such package exists.
    async fn get_package(&self, package_id: i32) -> Result<PackageDto, PackageServiceError>;

    /// Lists every package a user owns, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`PackageServiceError::Database`] on connection failures.
    async fn list_packages_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<PackageDto>, PackageServiceError>;

    /// Applies the provided changes to a package.
    ///
    /// # Errors
    ///
    /// - Returns [`PackageServiceError::Unauthorized`] unless `requester_id` owns the package
    /// - Returns [`PackageServiceError::Conflict`] when a new name is taken
    async fn update_package(
        &self,
        requester_id: i32,
        package_id: i32,
        update: PackageUpdate,
    ) -> Result<PackageDto, PackageServiceError>;

    /// Deletes a package and its flags.
    ///
    /// # Errors
    ///
    /// Returns [`PackageServiceError::Unauthorized`] unless `requester_id` owns the package.
    async fn delete_package(
        &self,
        requester_id: i32,
        package_id: i32,
    ) -> Result<(), PackageServiceError>;
}
