//! Active-record wrappers over the persistence entities.
//!
//! Instances come only from the named constructors (`load`, `create`);
//! mutation goes through validating setters that stage changes in an
//! explicit sea-orm changeset, and `save()` decides between insert and
//! update from whether the wrapper carries a persisted id.

use sea_orm::DbErr;
use thiserror::Error;

pub mod package;
pub mod package_flag;
pub mod user;

pub use package::{Category, Package};
pub use package_flag::PackageFlag;
pub use user::User;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    /// Lifecycle misuse (deleting an unsaved row, a write that did not
    /// land where it should) rather than bad input.
    #[error("{0}")]
    Invariant(String),

    #[error(transparent)]
    Storage(#[from] DbErr),
}
