//! `SeaORM` implementation of the `UserService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task;

use crate::auth::SessionManager;
use crate::config::SecurityConfig;
use crate::db::repositories::user::{generate_api_key, hash_password};
use crate::db::{PasswordDigest, Store};
use crate::domain::DomainEvent;
use crate::models::User;
use crate::services::user_service::{UserProfile, UserService, UserServiceError, UserUpdate};

pub struct SeaOrmUserService {
    store: Store,
    sessions: Arc<SessionManager>,
    security: SecurityConfig,
    event_bus: broadcast::Sender<DomainEvent>,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(
        store: Store,
        sessions: Arc<SessionManager>,
        security: SecurityConfig,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            store,
            sessions,
            security,
            event_bus,
        }
    }

    /// Argon2 hashing is CPU-bound, so it runs off the async runtime.
    async fn hash_in_background(&self, password: String) -> Result<PasswordDigest, UserServiceError> {
        let config = self.security.clone();
        task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .map_err(|e| UserServiceError::Internal(format!("Hashing task panicked: {e}")))?
            .map_err(|e| UserServiceError::Internal(e.to_string()))
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), UserServiceError> {
        let taken = self
            .store
            .get_user_by_username(username)
            .await
            .map_err(|e| UserServiceError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(UserServiceError::Conflict(
                "Username already exists".to_string(),
            ));
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), UserServiceError> {
        let taken = self
            .store
            .get_user_by_email(email)
            .await
            .map_err(|e| UserServiceError::Database(e.to_string()))?
            .is_some();
        if taken {
            return Err(UserServiceError::Conflict(
                "Email already exists".to_string(),
            ));
        }
        Ok(())
    }
}

fn profile_of(user: &User) -> UserProfile {
    UserProfile {
        id: user.id().unwrap_or_default(),
        username: user.username().to_string(),
        email: user.email().to_string(),
        profile_picture: user.profile_picture().map(ToString::to_string),
        created_at: user.created_at().to_string(),
        updated_at: user.updated_at().to_string(),
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<UserProfile, UserServiceError> {
        self.ensure_username_free(username).await?;
        self.ensure_email_free(email).await?;

        let digest = self.hash_in_background(password.to_string()).await?;
        let api_key = generate_api_key();

        let mut user = User::create(
            self.store.conn.clone(),
            username,
            &digest.hash,
            &digest.salt,
            email,
            &api_key,
        )?;
        let user_id = user.save().await?;

        let _ = self.event_bus.send(DomainEvent::UserCreated {
            user_id,
            username: username.to_string(),
        });

        Ok(profile_of(&user))
    }

    async fn get_user(&self, user_id: i32) -> Result<UserProfile, UserServiceError> {
        let user = User::load(self.store.conn.clone(), user_id).await?;
        let _ = self.event_bus.send(DomainEvent::UserRead { user_id });
        Ok(profile_of(&user))
    }

    async fn update_user(
        &self,
        requester_id: i32,
        user_id: i32,
        update: UserUpdate,
    ) -> Result<UserProfile, UserServiceError> {
        if requester_id != user_id {
            return Err(UserServiceError::Unauthorized);
        }

        let mut user = User::load(self.store.conn.clone(), user_id).await?;

        if let Some(ref username) = update.username
            && username != user.username()
        {
            self.ensure_username_free(username).await?;
            user.set_username(username)?;
        }
        if let Some(ref email) = update.email
            && email != user.email()
        {
            self.ensure_email_free(email).await?;
            user.set_email(email)?;
        }
        if let Some(password) = update.password {
            let digest = self.hash_in_background(password).await?;
            user.set_password_digest(&digest.hash, &digest.salt)?;
        }
        if let Some(ref url) = update.profile_picture {
            user.set_profile_picture(Some(url))?;
        }

        user.save().await?;

        let _ = self.event_bus.send(DomainEvent::UserUpdated { user_id });

        Ok(profile_of(&user))
    }

    async fn delete_user(&self, requester_id: i32, user_id: i32) -> Result<(), UserServiceError> {
        if requester_id != user_id {
            return Err(UserServiceError::Unauthorized);
        }

        let mut user = User::load(self.store.conn.clone(), user_id).await?;
        user.delete().await?;

        // Their refresh tokens die with the account.
        self.sessions.revoke_all(user_id).await;

        let _ = self.event_bus.send(DomainEvent::UserDeleted { user_id });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::db::repositories::user::verify_password;

    async fn test_service() -> (SeaOrmUserService, Arc<SessionManager>, Store) {
        let store = Store::new("sqlite::memory:").await.expect("store");
        let auth_config = AuthConfig {
            key_path: std::env::temp_dir()
                .join(format!("modelbay-user-svc-{}.json", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            ..AuthConfig::default()
        };
        let sessions = Arc::new(
            SessionManager::new(store.clone(), &auth_config).expect("session manager"),
        );
        let (event_bus, _rx) = broadcast::channel(16);
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };
        let service = SeaOrmUserService::new(store.clone(), sessions.clone(), security, event_bus);
        (service, sessions, store)
    }

    #[tokio::test]
    async fn create_user_returns_profile_without_secrets() {
        let (service, _, store) = test_service().await;

        let profile = service
            .create_user("alice", "Secret123", "alice@example.com")
            .await
            .expect("create");

        assert!(profile.id >= 1);
        assert_eq!(profile.username, "alice");
        assert_eq!(profile.email, "alice@example.com");

        let row = store
            .get_user(profile.id)
            .await
            .expect("query")
            .expect("row");
        assert!(row.password_hash.starts_with("$argon2id$"));
        assert!(!row.salt.is_empty());
        assert_eq!(row.api_key.len(), 64);
    }

    #[tokio::test]
    async fn duplicate_username_and_email_conflict() {
        let (service, _, _) = test_service().await;

        service
            .create_user("bob", "Secret123", "bob@example.com")
            .await
            .expect("first create");

        let err = service
            .create_user("bob", "Secret123", "other@example.com")
            .await
            .expect_err("username taken");
        assert!(matches!(err, UserServiceError::Conflict(_)));
        assert_eq!(err.to_string(), "Username already exists");

        let err = service
            .create_user("bobby", "Secret123", "bob@example.com")
            .await
            .expect_err("email taken");
        assert_eq!(err.to_string(), "Email already exists");
    }

    #[tokio::test]
    async fn update_requires_ownership() {
        let (service, _, _) = test_service().await;

        let profile = service
            .create_user("carol", "Secret123", "carol@example.com")
            .await
            .expect("create");

        let err = service
            .update_user(
                profile.id + 1,
                profile.id,
                UserUpdate {
                    email: Some("hijack@example.com".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .expect_err("not the owner");
        assert!(matches!(err, UserServiceError::Unauthorized));

        let unchanged = service.get_user(profile.id).await.expect("still there");
        assert_eq!(unchanged.email, "carol@example.com");
    }

    #[tokio::test]
    async fn password_update_replaces_hash_and_salt() {
        let (service, _, store) = test_service().await;

        let profile = service
            .create_user("dave", "Secret123", "dave@example.com")
            .await
            .expect("create");

        let before = store
            .get_user(profile.id)
            .await
            .expect("query")
            .expect("row");

        service
            .update_user(
                profile.id,
                profile.id,
                UserUpdate {
                    password: Some("Fresher456".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .expect("update");

        let after = store
            .get_user(profile.id)
            .await
            .expect("query")
            .expect("row");
        assert_ne!(before.password_hash, after.password_hash);
        assert_ne!(before.salt, after.salt);

        assert!(verify_password(after.password_hash.clone(), "Fresher456".to_string())
            .await
            .expect("verify"));
        assert!(!verify_password(after.password_hash, "Secret123".to_string())
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn delete_revokes_refresh_tokens() {
        let (service, sessions, _) = test_service().await;

        let profile = service
            .create_user("erin", "Secret123", "erin@example.com")
            .await
            .expect("create");

        let token = sessions.login("erin", "Secret123").await.expect("login");

        service
            .delete_user(profile.id, profile.id)
            .await
            .expect("delete");

        assert!(sessions.refresh(&token).await.is_err());
        assert!(matches!(
            service.get_user(profile.id).await,
            Err(UserServiceError::NotFound)
        ));
    }
}
