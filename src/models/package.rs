use std::fmt;

use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr};

use crate::db::records;
use crate::entities::{packages, prelude::*};
use crate::models::{PackageFlag, RecordError};

/// Closed set of package categories. Stored as its ordinal; rendered as
/// the lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Category {
    Image = 1,
    Text = 2,
    Video = 3,
    Audio = 4,
}

impl Category {
    #[must_use]
    pub const fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            1 => Some(Self::Image),
            2 => Some(Self::Text),
            3 => Some(Self::Video),
            4 => Some(Self::Audio),
            _ => None,
        }
    }

    #[must_use]
    pub const fn ordinal(self) -> i32 {
        self as i32
    }

    /// Case-insensitive name lookup ("image", "Text", ...).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "text" => Some(Self::Text),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active-record handle for one `packages` row.
pub struct Package {
    conn: DatabaseConnection,
    id: Option<i32>,
    user_id: i32,
    name: String,
    category: Category,
    description: String,
    input: String,
    output: String,
    markdown: String,
    num_api_calls: i32,
    last_updated: String,
    flags: Vec<PackageFlag>,
    changes: packages::ActiveModel,
}

impl Package {
    /// Loads a stored package and its flags.
    pub async fn load(conn: DatabaseConnection, id: i32) -> Result<Self, RecordError> {
        let model = records::read_by_id::<Packages>(&conn, id)
            .await?
            .ok_or(RecordError::NotFound)?;

        let category = Category::from_ordinal(model.category).ok_or_else(|| {
            RecordError::Invariant(format!("Stored category {} is unknown", model.category))
        })?;

        let flag_rows =
            records::find_by::<PackageFlags, _>(&conn, crate::entities::package_flags::Column::PackageId, id)
                .await?;
        let flags = flag_rows
            .into_iter()
            .map(|row| PackageFlag::from_model(conn.clone(), row))
            .collect();

        Ok(Self {
            conn,
            id: Some(model.id),
            user_id: model.user_id,
            name: model.name,
            category,
            description: model.description,
            input: model.input,
            output: model.output,
            markdown: model.markdown,
            num_api_calls: model.num_api_calls,
            last_updated: model.last_updated,
            flags,
            changes: <packages::ActiveModel as Default>::default(),
        })
    }

    /// Builds an unsaved package; all required fields are validated up
    /// front with the same rules the setters apply.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        conn: DatabaseConnection,
        user_id: i32,
        name: &str,
        category: Category,
        description: &str,
        input: &str,
        output: &str,
    ) -> Result<Self, RecordError> {
        if user_id < 1 {
            return Err(RecordError::Validation("Invalid ID number".to_string()));
        }
        if name.is_empty() {
            return Err(RecordError::Validation("New name is Invalid".to_string()));
        }
        if description.is_empty() {
            return Err(RecordError::Validation("Invalid description".to_string()));
        }
        if input.is_empty() {
            return Err(RecordError::Validation("New input is invalid".to_string()));
        }
        if output.is_empty() {
            return Err(RecordError::Validation("New output is invalid".to_string()));
        }

        Ok(Self {
            conn,
            id: None,
            user_id,
            name: name.to_string(),
            category,
            description: description.to_string(),
            input: input.to_string(),
            output: output.to_string(),
            markdown: String::new(),
            num_api_calls: 0,
            last_updated: String::new(),
            flags: Vec::new(),
            changes: <packages::ActiveModel as Default>::default(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> Option<i32> {
        self.id
    }

    #[must_use]
    pub const fn user_id(&self) -> i32 {
        self.user_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    #[must_use]
    pub const fn num_api_calls(&self) -> i32 {
        self.num_api_calls
    }

    #[must_use]
    pub fn last_updated(&self) -> &str {
        &self.last_updated
    }

    #[must_use]
    pub fn flags(&self) -> &[PackageFlag] {
        &self.flags
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), RecordError> {
        if name.is_empty() {
            return Err(RecordError::Validation("New name is Invalid".to_string()));
        }
        self.name = name.to_string();
        self.changes.name = Set(self.name.clone());
        Ok(())
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        self.changes.category = Set(category.ordinal());
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), RecordError> {
        if description.is_empty() {
            return Err(RecordError::Validation("Invalid description".to_string()));
        }
        self.description = description.to_string();
        self.changes.description = Set(self.description.clone());
        Ok(())
    }

    pub fn set_input(&mut self, input: &str) -> Result<(), RecordError> {
        if input.is_empty() {
            return Err(RecordError::Validation("New input is invalid".to_string()));
        }
        self.input = input.to_string();
        self.changes.input = Set(self.input.clone());
        Ok(())
    }

    pub fn set_output(&mut self, output: &str) -> Result<(), RecordError> {
        if output.is_empty() {
            return Err(RecordError::Validation("New output is invalid".to_string()));
        }
        self.output = output.to_string();
        self.changes.output = Set(self.output.clone());
        Ok(())
    }

    pub fn set_markdown(&mut self, markdown: &str) -> Result<(), RecordError> {
        if markdown.is_empty() {
            return Err(RecordError::Validation("New markdown is Invalid".to_string()));
        }
        self.markdown = markdown.to_string();
        self.changes.markdown = Set(self.markdown.clone());
        Ok(())
    }

    pub fn set_user_id(&mut self, user_id: i32) -> Result<(), RecordError> {
        if user_id < 1 {
            return Err(RecordError::Validation("Invalid ID number".to_string()));
        }
        self.user_id = user_id;
        self.changes.user_id = Set(user_id);
        Ok(())
    }

    /// Stages a flag; it is written on the next `save()`.
    pub fn add_flag(&mut self, flag_id: i32) -> Result<(), RecordError> {
        let flag = PackageFlag::create(self.conn.clone(), flag_id)?;
        self.flags.push(flag);
        Ok(())
    }

    /// Persists the wrapper. Unsaved instances insert the full row and
    /// take the assigned id; saved instances write only the staged
    /// changes. A clean save is a no-op returning 0, otherwise the id of
    /// the written row comes back. `last_updated` is refreshed on every
    /// real write.
    pub async fn save(&mut self) -> Result<i32, RecordError> {
        match self.id {
            None => {
                let now = chrono::Utc::now().to_rfc3339();
                let row = packages::ActiveModel {
                    user_id: Set(self.user_id),
                    name: Set(self.name.clone()),
                    category: Set(self.category.ordinal()),
                    description: Set(self.description.clone()),
                    input: Set(self.input.clone()),
                    output: Set(self.output.clone()),
                    markdown: Set(self.markdown.clone()),
                    num_api_calls: Set(self.num_api_calls),
                    last_updated: Set(now),
                    ..Default::default()
                };

                let stored = records::create(&self.conn, row).await?;
                self.id = Some(stored.id);
                self.last_updated = stored.last_updated;
                self.changes = <packages::ActiveModel as Default>::default();
                self.save_pending_flags(stored.id).await?;
                Ok(stored.id)
            }
            Some(id) => {
                let has_pending_flags = self.flags.iter().any(|f| f.id().is_none());
                if !self.changes.is_changed() && !has_pending_flags {
                    return Ok(0);
                }

                if self.changes.is_changed() {
                    let mut changes = std::mem::take(&mut self.changes);
                    changes.id = Unchanged(id);
                    changes.last_updated = Set(chrono::Utc::now().to_rfc3339());

                    let stored = records::update(&self.conn, changes).await.map_err(|e| {
                        if matches!(e, DbErr::RecordNotUpdated) {
                            RecordError::NotFound
                        } else {
                            RecordError::Storage(e)
                        }
                    })?;

                    if stored.id != id {
                        return Err(RecordError::Invariant(
                            "Package could not be updated".to_string(),
                        ));
                    }
                    self.last_updated = stored.last_updated;
                }

                self.save_pending_flags(id).await?;
                Ok(id)
            }
        }
    }

    async fn save_pending_flags(&mut self, package_id: i32) -> Result<(), RecordError> {
        for flag in &mut self.flags {
            if flag.id().is_none() {
                flag.set_package_id(package_id)?;
                flag.save().await?;
            }
        }
        Ok(())
    }

    /// Removes the stored row; flags go with it. The id resets so the
    /// instance cannot be deleted or updated again.
    pub async fn delete(&mut self) -> Result<(), RecordError> {
        let id = self
            .id
            .ok_or_else(|| RecordError::Invariant("Delete Failed".to_string()))?;

        let affected = records::remove::<Packages>(&self.conn, id).await?;
        if affected == 0 {
            return Err(RecordError::NotFound);
        }

        self.id = None;
        self.flags.clear();
        self.changes = <packages::ActiveModel as Default>::default();
        Ok(())
    }
}
