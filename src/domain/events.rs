//! Domain events for the application.
//!
//! The enum is the complete topic set: services publish these over the
//! broadcast bus, the audit listener persists them, and the SSE endpoint
//! streams them to clients. A variant that does not exist cannot be
//! published, so there is no unknown-topic path anywhere.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    UserCreated {
        user_id: i32,
        username: String,
    },
    UserRead {
        user_id: i32,
    },
    UserUpdated {
        user_id: i32,
    },
    UserDeleted {
        user_id: i32,
    },

    PackageCreated {
        package_id: i32,
        user_id: i32,
        name: String,
    },
    PackageRead {
        package_id: i32,
    },
    PackageUpdated {
        package_id: i32,
        user_id: i32,
    },
    PackageDeleted {
        package_id: i32,
        user_id: i32,
    },

    LoginSucceeded {
        user_id: i32,
        username: String,
    },
    LoginFailed {
        username: String,
    },
    RefreshSucceeded {
        user_id: i32,
    },
    RefreshFailed,
    LogoutSucceeded {
        user_id: i32,
        global: bool,
    },
    LogoutFailed {
        user_id: i32,
    },
}

impl DomainEvent {
    /// Stable name used as the audit-log event type and the SSE tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserCreated { .. } => "UserCreated",
            Self::UserRead { .. } => "UserRead",
            Self::UserUpdated { .. } => "UserUpdated",
            Self::UserDeleted { .. } => "UserDeleted",
            Self::PackageCreated { .. } => "PackageCreated",
            Self::PackageRead { .. } => "PackageRead",
            Self::PackageUpdated { .. } => "PackageUpdated",
            Self::PackageDeleted { .. } => "PackageDeleted",
            Self::LoginSucceeded { .. } => "LoginSucceeded",
            Self::LoginFailed { .. } => "LoginFailed",
            Self::RefreshSucceeded { .. } => "RefreshSucceeded",
            Self::RefreshFailed => "RefreshFailed",
            Self::LogoutSucceeded { .. } => "LogoutSucceeded",
            Self::LogoutFailed { .. } => "LogoutFailed",
        }
    }
}
