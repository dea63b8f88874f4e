use serde::Serialize;

use crate::db::SystemLog;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub users: u64,
    pub packages: u64,
    pub active_refresh_tokens: usize,
}

#[derive(Debug, Serialize)]
pub struct LogDto {
    pub id: i64,
    pub event_type: String,
    pub level: String,
    pub message: String,
    pub actor: Option<i32>,
    pub details: Option<String>,
    pub created_at: String,
}

impl From<SystemLog> for LogDto {
    fn from(model: SystemLog) -> Self {
        Self {
            id: model.id,
            event_type: model.event_type,
            level: model.level,
            message: model.message,
            actor: model.actor,
            details: model.details,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub logs: Vec<LogDto>,
    pub total_pages: u64,
}
