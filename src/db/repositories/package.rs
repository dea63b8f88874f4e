use anyhow::{Context, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use crate::entities::{package_flags, packages};

/// Read-side package queries. Writes go through `models::Package`.
pub struct PackageRepository {
    conn: DatabaseConnection,
}

impl PackageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<packages::Model>> {
        packages::Entity::find()
            .filter(packages::Column::Name.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query package by name")
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<packages::Model>> {
        packages::Entity::find()
            .filter(packages::Column::UserId.eq(user_id))
            .order_by_asc(packages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list packages for user")
    }

    pub async fn flags_for_package(&self, package_id: i32) -> Result<Vec<package_flags::Model>> {
        package_flags::Entity::find()
            .filter(package_flags::Column::PackageId.eq(package_id))
            .order_by_asc(package_flags::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to load package flags")
    }

    pub async fn count(&self) -> Result<u64> {
        packages::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count packages")
    }
}
