//! `SessionManager`-backed implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::auth::SessionManager;
use crate::db::Store;
use crate::domain::DomainEvent;
use crate::services::auth_service::{AuthError, AuthService, LoginResult, SessionResult};

pub struct SeaOrmAuthService {
    sessions: Arc<SessionManager>,
    store: Store,
    event_bus: broadcast::Sender<DomainEvent>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(
        sessions: Arc<SessionManager>,
        store: Store,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> Self {
        Self {
            sessions,
            store,
            event_bus,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let refresh_token = match self.sessions.login(username, password).await {
            Ok(token) => token,
            Err(err) => {
                let _ = self.event_bus.send(DomainEvent::LoginFailed {
                    username: username.to_string(),
                });
                return Err(err);
            }
        };

        // The manager already resolved the user; fetch it again for the event payload.
        let user = self
            .store
            .get_user_by_username(username)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?
            .ok_or(AuthError::InvalidUsername)?;

        let _ = self.event_bus.send(DomainEvent::LoginSucceeded {
            user_id: user.id,
            username: user.username,
        });

        Ok(LoginResult { refresh_token })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionResult, AuthError> {
        let session_token = match self.sessions.refresh(refresh_token).await {
            Ok(token) => token,
            Err(err) => {
                let _ = self.event_bus.send(DomainEvent::RefreshFailed);
                return Err(err);
            }
        };

        if let Ok(user_id) = self.sessions.authorize(&session_token) {
            let _ = self
                .event_bus
                .send(DomainEvent::RefreshSucceeded { user_id });
        }

        Ok(SessionResult { session_token })
    }

    fn authorize(&self, session_token: &str) -> Result<i32, AuthError> {
        self.sessions.authorize(session_token)
    }

    async fn logout(
        &self,
        user_id: i32,
        refresh_token: &str,
        global: bool,
    ) -> Result<(), AuthError> {
        match self.sessions.logout(user_id, refresh_token, global).await {
            Ok(()) => {
                let _ = self
                    .event_bus
                    .send(DomainEvent::LogoutSucceeded { user_id, global });
                Ok(())
            }
            Err(err) => {
                let _ = self.event_bus.send(DomainEvent::LogoutFailed { user_id });
                Err(err)
            }
        }
    }

    async fn authenticate_api_key(&self, api_key: &str) -> Result<Option<i32>, AuthError> {
        let user = self
            .store
            .get_user_by_api_key(api_key)
            .await
            .map_err(|e| AuthError::Database(e.to_string()))?;
        Ok(user.map(|u| u.id))
    }
}
