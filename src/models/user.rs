use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr};

use crate::db::records;
use crate::entities::{prelude::*, users};
use crate::models::RecordError;

/// Active-record handle for one `users` row. Passwords are handled only
/// as (hash, salt) pairs; plaintext never reaches this type.
#[derive(Debug)]
pub struct User {
    conn: DatabaseConnection,
    id: Option<i32>,
    username: String,
    password_hash: String,
    salt: String,
    email: String,
    api_key: String,
    profile_picture: Option<String>,
    created_at: String,
    updated_at: String,
    changes: users::ActiveModel,
}

impl User {
    pub async fn load(conn: DatabaseConnection, id: i32) -> Result<Self, RecordError> {
        let model = records::read_by_id::<Users>(&conn, id)
            .await?
            .ok_or(RecordError::NotFound)?;
        Ok(Self::from_model(conn, model))
    }

    #[must_use]
    pub fn from_model(conn: DatabaseConnection, model: users::Model) -> Self {
        Self {
            conn,
            id: Some(model.id),
            username: model.username,
            password_hash: model.password_hash,
            salt: model.salt,
            email: model.email,
            api_key: model.api_key,
            profile_picture: model.profile_picture,
            created_at: model.created_at,
            updated_at: model.updated_at,
            changes: <users::ActiveModel as Default>::default(),
        }
    }

    /// Builds an unsaved user from already-hashed credentials.
    pub fn create(
        conn: DatabaseConnection,
        username: &str,
        password_hash: &str,
        salt: &str,
        email: &str,
        api_key: &str,
    ) -> Result<Self, RecordError> {
        if username.is_empty() || password_hash.is_empty() || salt.is_empty() || email.is_empty() || api_key.is_empty()
        {
            return Err(RecordError::Validation(
                "One or more invalid method arguments".to_string(),
            ));
        }

        Ok(Self {
            conn,
            id: None,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            salt: salt.to_string(),
            email: email.to_string(),
            api_key: api_key.to_string(),
            profile_picture: None,
            created_at: String::new(),
            updated_at: String::new(),
            changes: <users::ActiveModel as Default>::default(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> Option<i32> {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn salt(&self) -> &str {
        &self.salt
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn profile_picture(&self) -> Option<&str> {
        self.profile_picture.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> &str {
        &self.updated_at
    }

    pub fn set_username(&mut self, username: &str) -> Result<(), RecordError> {
        if username.is_empty() {
            return Err(RecordError::Validation(
                "One or more invalid method arguments".to_string(),
            ));
        }
        self.username = username.to_string();
        self.changes.username = Set(self.username.clone());
        Ok(())
    }

    pub fn set_email(&mut self, email: &str) -> Result<(), RecordError> {
        if email.is_empty() {
            return Err(RecordError::Validation(
                "One or more invalid method arguments".to_string(),
            ));
        }
        self.email = email.to_string();
        self.changes.email = Set(self.email.clone());
        Ok(())
    }

    /// Replaces the stored credentials; both halves always travel
    /// together so the salt column never goes stale.
    pub fn set_password_digest(&mut self, hash: &str, salt: &str) -> Result<(), RecordError> {
        if hash.is_empty() || salt.is_empty() {
            return Err(RecordError::Validation(
                "One or more invalid method arguments".to_string(),
            ));
        }
        self.password_hash = hash.to_string();
        self.salt = salt.to_string();
        self.changes.password_hash = Set(self.password_hash.clone());
        self.changes.salt = Set(self.salt.clone());
        Ok(())
    }

    pub fn set_profile_picture(&mut self, url: Option<&str>) -> Result<(), RecordError> {
        if let Some(url) = url
            && url.is_empty()
        {
            return Err(RecordError::Validation(
                "One or more invalid method arguments".to_string(),
            ));
        }
        self.profile_picture = url.map(ToString::to_string);
        self.changes.profile_picture = Set(self.profile_picture.clone());
        Ok(())
    }

    pub fn set_api_key(&mut self, api_key: &str) -> Result<(), RecordError> {
        if api_key.is_empty() {
            return Err(RecordError::Validation(
                "One or more invalid method arguments".to_string(),
            ));
        }
        self.api_key = api_key.to_string();
        self.changes.api_key = Set(self.api_key.clone());
        Ok(())
    }

    /// Insert when the wrapper has no id, minimal update otherwise; a
    /// clean update is a no-op returning 0.
    pub async fn save(&mut self) -> Result<i32, RecordError> {
        match self.id {
            None => {
                let now = chrono::Utc::now().to_rfc3339();
                let row = users::ActiveModel {
                    username: Set(self.username.clone()),
                    password_hash: Set(self.password_hash.clone()),
                    salt: Set(self.salt.clone()),
                    email: Set(self.email.clone()),
                    api_key: Set(self.api_key.clone()),
                    profile_picture: Set(self.profile_picture.clone()),
                    created_at: Set(now.clone()),
                    updated_at: Set(now),
                    ..Default::default()
                };

                let stored = records::create(&self.conn, row).await?;
                self.id = Some(stored.id);
                self.created_at = stored.created_at;
                self.updated_at = stored.updated_at;
                self.changes = <users::ActiveModel as Default>::default();
                Ok(stored.id)
            }
            Some(id) => {
                if !self.changes.is_changed() {
                    return Ok(0);
                }

                let mut changes = std::mem::take(&mut self.changes);
                changes.id = Unchanged(id);
                changes.updated_at = Set(chrono::Utc::now().to_rfc3339());

                let stored = records::update(&self.conn, changes).await.map_err(|e| {
                    if matches!(e, DbErr::RecordNotUpdated) {
                        RecordError::NotFound
                    } else {
                        RecordError::Storage(e)
                    }
                })?;

                if stored.id != id {
                    return Err(RecordError::Invariant(
                        "User could not be updated".to_string(),
                    ));
                }
                self.updated_at = stored.updated_at;
                Ok(id)
            }
        }
    }

    pub async fn delete(&mut self) -> Result<(), RecordError> {
        let id = self
            .id
            .ok_or_else(|| RecordError::Invariant("Delete Failed".to_string()))?;

        let affected = records::remove::<Users>(&self.conn, id).await?;
        if affected == 0 {
            return Err(RecordError::NotFound);
        }

        self.id = None;
        self.changes = <users::ActiveModel as Default>::default();
        Ok(())
    }
}
