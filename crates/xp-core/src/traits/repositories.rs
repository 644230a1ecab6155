//! Repository traits (ports) - define the interface for data access
//!
//! The engine relies on every write below being atomic for a single
//! (guild, user) row. Implementations map each operation onto one conditional
//! statement (or one transaction for the weekly rollover) so concurrent award
//! attempts serialize in the store rather than in process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    ActivityRecord, ActivitySnapshot, LeaderboardEntry, LeaderboardOrder, VoiceSession,
    WeeklyArchive,
};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

#[async_trait]
pub trait ActivityStore: Send + Sync {
    // =========================================================================
    // Records
    // =========================================================================

    /// Find a record without creating it
    async fn get(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<ActivityRecord>>;

    /// Find a record, creating a zeroed one (level 1) if missing
    async fn get_or_create(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<ActivityRecord>;

    /// Add `xp` to total and weekly XP and stamp the message award time.
    /// Returns false if the record does not exist.
    async fn apply_message_award(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool>;

    /// Add `xp` to total and weekly XP and stamp the voice award time.
    /// Returns false if the record does not exist.
    async fn apply_voice_award(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool>;

    /// Overwrite total XP, and weekly XP when given
    async fn set_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        total_xp: u64,
        weekly_xp: Option<u64>,
    ) -> RepoResult<bool>;

    /// Overwrite weekly XP only
    async fn set_weekly_xp(&self, guild_id: Snowflake, user_id: Snowflake, weekly_xp: u64) -> RepoResult<bool>;

    /// Overwrite the cached level
    async fn set_level(&self, guild_id: Snowflake, user_id: Snowflake, level: u32) -> RepoResult<bool>;

    /// Zero every counter and timestamp, level back to 1
    async fn reset_all(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool>;

    async fn increment_voice_minutes(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        minutes: u64,
    ) -> RepoResult<bool>;

    async fn increment_message_count(&self, guild_id: Snowflake, user_id: Snowflake, n: u64) -> RepoResult<bool>;

    // =========================================================================
    // Rankings
    // =========================================================================

    /// Top `limit` records by score; ties keep user id order.
    /// The weekly board only lists members with weekly XP.
    async fn leaderboard(
        &self,
        guild_id: Snowflake,
        limit: u32,
        order: LeaderboardOrder,
    ) -> RepoResult<Vec<LeaderboardEntry>>;

    /// 1 + number of members with a strictly higher score; `None` without a record
    async fn rank_of(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        order: LeaderboardOrder,
    ) -> RepoResult<Option<u32>>;

    // =========================================================================
    // Weekly rollover
    // =========================================================================

    /// Archive every member with weekly XP, then zero weekly XP, voice minutes
    /// and message counts for the guild. One atomic step.
    async fn rollover_weekly(&self, guild_id: Snowflake, now: DateTime<Utc>) -> RepoResult<WeeklyArchive>;

    /// Most recent archives first
    async fn weekly_archives(&self, guild_id: Snowflake, limit: u32) -> RepoResult<Vec<WeeklyArchive>>;

    /// Everything stored for a guild
    async fn export(&self, guild_id: Snowflake) -> RepoResult<ActivitySnapshot>;

    // =========================================================================
    // Voice sessions
    // =========================================================================

    /// Start (or replace) the member's session
    async fn start_session(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Snowflake,
        now: i64,
    ) -> RepoResult<()>;

    /// Point an existing session at another channel
    async fn move_session(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<bool>;

    async fn end_session(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool>;

    async fn active_sessions(&self, guild_id: Snowflake) -> RepoResult<Vec<VoiceSession>>;

    async fn touch_session_tick(&self, guild_id: Snowflake, user_id: Snowflake, now: i64) -> RepoResult<bool>;
}
