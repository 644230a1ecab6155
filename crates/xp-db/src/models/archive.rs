//! Weekly archive database model

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Database model for weekly_archives table
#[derive(Debug, Clone, FromRow)]
pub struct WeeklyArchiveModel {
    pub id: i64,
    pub guild_id: i64,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    /// JSON array of `{user_id, weekly_xp}`, highest first
    pub entries: JsonValue,
    pub created_at: DateTime<Utc>,
}
