//! Voice session database model

use sqlx::FromRow;

/// Database model for voice_sessions table
#[derive(Debug, Clone, FromRow)]
pub struct VoiceSessionModel {
    pub guild_id: i64,
    pub user_id: i64,
    pub channel_id: i64,
    pub joined_at: i64,
    pub last_tick_at: i64,
}
