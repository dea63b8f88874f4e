//! `SeaORM` implementation of the `PackageService` trait.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::db::Store;
use crate::domain::DomainEvent;
use crate::entities::{package_flags, packages};
use crate::models::{Category, Package};
use crate::services::package_service::{
    NewPackage, PackageDto, PackageService, PackageServiceError, PackageUpdate,
};

pub struct SeaOrmPackageService {
    store: Store,
    event_bus: broadcast::Sender<DomainEvent>,
}

impl SeaOrmPackageService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<DomainEvent>) -> Self {
        Self { store, event_bus }
    }

    async fn ensure_name_free(&self, name: &str) -> Result<(), PackageServiceError> {
        let taken = self
            .store
            .get_package_by_name(name)
            .await
            .map_err(|e| PackageServiceError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(PackageServiceError::Conflict(
                "Package name already exists".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_category(name: &str) -> Result<Category, PackageServiceError> {
    Category::parse(name)
        .ok_or_else(|| PackageServiceError::Validation(format!("Unknown category: {name}")))
}

fn dto_of(package: &Package) -> PackageDto {
    PackageDto {
        id: package.id().unwrap_or_default(),
        user_id: package.user_id(),
        name: package.name().to_string(),
        category: package.category().to_string(),
        description: package.description().to_string(),
        input: package.input().to_string(),
        output: package.output().to_string(),
        markdown: package.markdown().to_string(),
        num_api_calls: package.num_api_calls(),
        last_updated: package.last_updated().to_string(),
        flags: package.flags().iter().map(|f| f.flag_id()).collect(),
    }
}

fn dto_from_row(
    row: packages::Model,
    flags: &[package_flags::Model],
) -> Result<PackageDto, PackageServiceError> {
    let category = Category::from_ordinal(row.category).ok_or_else(|| {
        PackageServiceError::Internal(format!("Stored category {} is unknown", row.category))
    })?;
    Ok(PackageDto {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        category: category.to_string(),
        description: row.description,
        input: row.input,
        output: row.output,
        markdown: row.markdown,
        num_api_calls: row.num_api_calls,
        last_updated: row.last_updated,
        flags: flags.iter().map(|f| f.flag_id).collect(),
    })
}

#[async_trait]
impl PackageService for SeaOrmPackageService {
    async fn create_package(
        &self,
        owner_id: i32,
        new: NewPackage,
    ) -> Result<PackageDto, PackageServiceError> {
        // Category resolves before anything touches storage.
        let category = parse_category(&new.category)?;
        self.ensure_name_free(&new.name).await?;

        let mut package = Package::create(
            self.store.conn.clone(),
            owner_id,
            &new.name,
            category,
            &new.description,
            &new.input,
            &new.output,
        )?;

        if let Some(ref markdown) = new.markdown {
            package.set_markdown(markdown)?;
        }
        for flag_id in new.flags.unwrap_or_default() {
            package.add_flag(flag_id)?;
        }

        let package_id = package.save().await?;

        let _ = self.event_bus.send(DomainEvent::PackageCreated {
            package_id,
            user_id: owner_id,
            name: new.name,
        });

        Ok(dto_of(&package))
    }

    async fn get_package(&self, package_id: i32) -> Result<PackageDto, PackageServiceError> {
        let package = Package::load(self.store.conn.clone(), package_id).await?;
        let _ = self.event_bus.send(DomainEvent::PackageRead { package_id });
        Ok(dto_of(&package))
    }

    async fn list_packages_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<PackageDto>, PackageServiceError> {
        let rows = self
            .store
            .get_packages_for_user(user_id)
            .await
            .map_err(|e| PackageServiceError::Database(e.to_string()))?;

        let mut dtos = Vec::with_capacity(rows.len());
        for row in rows {
            let flags = self
                .store
                .get_package_flags(row.id)
                .await
                .map_err(|e| PackageServiceError::Database(e.to_string()))?;
            dtos.push(dto_from_row(row, &flags)?);
        }
        Ok(dtos)
    }

    async fn update_package(
        &self,
        requester_id: i32,
        package_id: i32,
        update: PackageUpdate,
    ) -> Result<PackageDto, PackageServiceError> {
        let mut package = Package::load(self.store.conn.clone(), package_id).await?;
        if package.user_id() != requester_id {
            return Err(PackageServiceError::Unauthorized);
        }

        if let Some(ref category) = update.category {
            package.set_category(parse_category(category)?);
        }
        if let Some(ref name) = update.name
            && name != package.name()
        {
            self.ensure_name_free(name).await?;
            package.set_name(name)?;
        }
        if let Some(ref description) = update.description {
            package.set_description(description)?;
        }
        if let Some(ref input) = update.input {
            package.set_input(input)?;
        }
        if let Some(ref output) = update.output {
            package.set_output(output)?;
        }
        if let Some(ref markdown) = update.markdown {
            package.set_markdown(markdown)?;
        }

        package.save().await?;

        let _ = self.event_bus.send(DomainEvent::PackageUpdated {
            package_id,
            user_id: requester_id,
        });

        Ok(dto_of(&package))
    }

    async fn delete_package(
        &self,
        requester_id: i32,
        package_id: i32,
    ) -> Result<(), PackageServiceError> {
        let mut package = Package::load(self.store.conn.clone(), package_id).await?;
        if package.user_id() != requester_id {
            return Err(PackageServiceError::Unauthorized);
        }

        package.delete().await?;

        let _ = self.event_bus.send(DomainEvent::PackageDeleted {
            package_id,
            user_id: requester_id,
        });

        Ok(())
    }
}
