use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr};

use crate::db::records;
use crate::entities::{package_flags, prelude::*};
use crate::models::RecordError;

/// Active-record handle for one `package_flags` row. Usually managed by
/// `Package`, which stages flags and saves them with itself.
pub struct PackageFlag {
    conn: DatabaseConnection,
    id: Option<i32>,
    package_id: Option<i32>,
    flag_id: i32,
    changes: package_flags::ActiveModel,
}

impl PackageFlag {
    pub async fn load(conn: DatabaseConnection, id: i32) -> Result<Self, RecordError> {
        let model = records::read_by_id::<PackageFlags>(&conn, id)
            .await?
            .ok_or(RecordError::NotFound)?;
        Ok(Self::from_model(conn, model))
    }

    #[must_use]
    pub fn from_model(conn: DatabaseConnection, model: package_flags::Model) -> Self {
        Self {
            conn,
            id: Some(model.id),
            package_id: Some(model.package_id),
            flag_id: model.flag_id,
            changes: <package_flags::ActiveModel as Default>::default(),
        }
    }

    /// Builds an unsaved flag, not yet attached to a package.
    pub fn create(conn: DatabaseConnection, flag_id: i32) -> Result<Self, RecordError> {
        if flag_id < 1 {
            return Err(RecordError::Validation("Invalid flag ID".to_string()));
        }
        Ok(Self {
            conn,
            id: None,
            package_id: None,
            flag_id,
            changes: <package_flags::ActiveModel as Default>::default(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> Option<i32> {
        self.id
    }

    #[must_use]
    pub const fn package_id(&self) -> Option<i32> {
        self.package_id
    }

    #[must_use]
    pub const fn flag_id(&self) -> i32 {
        self.flag_id
    }

    pub fn set_flag_id(&mut self, flag_id: i32) -> Result<(), RecordError> {
        if flag_id < 1 {
            return Err(RecordError::Validation("Invalid flag ID".to_string()));
        }
        self.flag_id = flag_id;
        self.changes.flag_id = Set(flag_id);
        Ok(())
    }

    pub fn set_package_id(&mut self, package_id: i32) -> Result<(), RecordError> {
        if package_id < 1 {
            return Err(RecordError::Validation("New ID is Invalid".to_string()));
        }
        self.package_id = Some(package_id);
        self.changes.package_id = Set(package_id);
        Ok(())
    }

    pub async fn save(&mut self) -> Result<i32, RecordError> {
        match self.id {
            None => {
                let package_id = self.package_id.ok_or_else(|| {
                    RecordError::Invariant("Flag is not attached to a package".to_string())
                })?;
                let row = package_flags::ActiveModel {
                    package_id: Set(package_id),
                    flag_id: Set(self.flag_id),
                    ..Default::default()
                };
                let stored = records::create(&self.conn, row).await?;
                self.id = Some(stored.id);
                self.changes = <package_flags::ActiveModel as Default>::default();
                Ok(stored.id)
            }
            Some(id) => {
                if !self.changes.is_changed() {
                    return Ok(0);
                }
                let mut changes = std::mem::take(&mut self.changes);
                changes.id = Unchanged(id);
                let stored = records::update(&self.conn, changes).await.map_err(|e| {
                    if matches!(e, DbErr::RecordNotUpdated) {
                        RecordError::NotFound
                    } else {
                        RecordError::Storage(e)
                    }
                })?;
                if stored.id != id {
                    return Err(RecordError::Invariant(
                        "Flag could not be updated".to_string(),
                    ));
                }
                Ok(id)
            }
        }
    }

    pub async fn delete(&mut self) -> Result<(), RecordError> {
        let id = self
            .id
            .ok_or_else(|| RecordError::Invariant("Delete Failed".to_string()))?;

        let affected = records::remove::<PackageFlags>(&self.conn, id).await?;
        if affected == 0 {
            return Err(RecordError::NotFound);
        }

        self.id = None;
        Ok(())
    }
}
