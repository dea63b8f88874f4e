//! Persists domain events to the `system_logs` table.
//!
//! Subscribes to the event bus like any other consumer; a slow write
//! here never blocks a publisher.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::error;

use crate::db::Store;
use crate::domain::DomainEvent;

pub struct AuditService {
    store: Store,
    event_bus: broadcast::Sender<DomainEvent>,
}

impl AuditService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<DomainEvent>) -> Self {
        Self { store, event_bus }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle_event(event).await {
                            error!(error = %e, "Failed to save audit entry");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        error!(count, "Audit listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Audit listener event bus closed");
                        break;
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: DomainEvent) -> anyhow::Result<()> {
        let (level, message, actor) = match &event {
            DomainEvent::UserCreated { user_id, username } => (
                "info",
                format!("User registered: {username}"),
                Some(*user_id),
            ),
            DomainEvent::UserUpdated { user_id } => {
                ("info", format!("User {user_id} updated"), Some(*user_id))
            }
            DomainEvent::UserDeleted { user_id } => {
                ("info", format!("User {user_id} deleted"), Some(*user_id))
            }
            DomainEvent::PackageCreated {
                package_id,
                user_id,
                name,
            } => (
                "info",
                format!("Package registered: {name} (#{package_id})"),
                Some(*user_id),
            ),
            DomainEvent::PackageUpdated {
                package_id,
                user_id,
            } => (
                "info",
                format!("Package {package_id} updated"),
                Some(*user_id),
            ),
            DomainEvent::PackageDeleted {
                package_id,
                user_id,
            } => (
                "info",
                format!("Package {package_id} deleted"),
                Some(*user_id),
            ),
            DomainEvent::LoginSucceeded { user_id, username } => {
                ("info", format!("Login: {username}"), Some(*user_id))
            }
            DomainEvent::LoginFailed { username } => {
                ("warn", format!("Failed login for {username}"), None)
            }
            DomainEvent::RefreshSucceeded { user_id } => (
                "info",
                format!("Session refreshed for user {user_id}"),
                Some(*user_id),
            ),
            DomainEvent::RefreshFailed => ("warn", "Session refresh rejected".to_string(), None),
            DomainEvent::LogoutSucceeded { user_id, global } => (
                "info",
                if *global {
                    format!("User {user_id} logged out everywhere")
                } else {
                    format!("User {user_id} logged out")
                },
                Some(*user_id),
            ),
            DomainEvent::LogoutFailed { user_id } => (
                "warn",
                format!("Logout rejected for user {user_id}"),
                Some(*user_id),
            ),

            // Plain reads stay out of the audit trail.
            DomainEvent::UserRead { .. } | DomainEvent::PackageRead { .. } => return Ok(()),
        };

        let details = serde_json::to_string(&event)?;
        self.store
            .add_log(event.name(), level, &message, actor, Some(details))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_audit() -> (AuditService, Store) {
        let store = Store::new("sqlite::memory:").await.expect("store");
        let (event_bus, _rx) = broadcast::channel(16);
        (AuditService::new(store.clone(), event_bus), store)
    }

    #[tokio::test]
    async fn events_land_in_system_logs() {
        let (audit, store) = test_audit().await;

        audit
            .handle_event(DomainEvent::UserCreated {
                user_id: 1,
                username: "alice".to_string(),
            })
            .await
            .expect("handle");
        audit
            .handle_event(DomainEvent::LoginFailed {
                username: "mallory".to_string(),
            })
            .await
            .expect("handle");

        let (entries, _) = store.get_logs(1, 50, None, None).await.expect("logs");
        assert_eq!(entries.len(), 2);

        let failed = entries
            .iter()
            .find(|e| e.event_type == "LoginFailed")
            .expect("failed login entry");
        assert_eq!(failed.level, "warn");
        assert_eq!(failed.actor, None);

        let created = entries
            .iter()
            .find(|e| e.event_type == "UserCreated")
            .expect("user created entry");
        assert_eq!(created.actor, Some(1));
        assert!(created.details.as_deref().is_some_and(|d| d.contains("alice")));
    }

    #[tokio::test]
    async fn reads_are_not_persisted() {
        let (audit, store) = test_audit().await;

        audit
            .handle_event(DomainEvent::UserRead { user_id: 1 })
            .await
            .expect("handle");
        audit
            .handle_event(DomainEvent::PackageRead { package_id: 2 })
            .await
            .expect("handle");

        let (entries, _) = store.get_logs(1, 50, None, None).await.expect("logs");
        assert!(entries.is_empty());
    }
}
