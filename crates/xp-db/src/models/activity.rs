//! Activity record database model

use sqlx::FromRow;

/// Database model for activity_records table
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRecordModel {
    pub guild_id: i64,
    pub user_id: i64,
    pub total_xp: i64,
    pub weekly_xp: i64,
    pub level: i32,
    pub last_message_award_at: i64,
    pub last_voice_award_at: i64,
    pub voice_minutes: i64,
    pub message_count: i64,
}

/// Weekly score read during rollover
#[derive(Debug, Clone, FromRow)]
pub struct ScoreModel {
    pub user_id: i64,
    pub weekly_xp: i64,
}
