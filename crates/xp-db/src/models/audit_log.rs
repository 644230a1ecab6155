//! Audit log database model

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Database model for audit_logs table
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogModel {
    pub id: i64,
    pub guild_id: i64,
    pub user_id: Option<i64>,
    pub role_id: Option<i64>,
    /// `AuditKind` in SCREAMING_SNAKE_CASE
    pub action: String,
    pub reason: Option<String>,
    pub detail: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}
