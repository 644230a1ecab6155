//! PostgreSQL implementation of ActivityStore
//!
//! Every per-member write is a single statement keyed on the primary key, so
//! concurrent awards for the same member serialize on the row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use xp_core::entities::{
    ActivityRecord, ActivitySnapshot, ArchiveEntry, LeaderboardEntry, LeaderboardOrder,
    VoiceSession, WeeklyArchive,
};
use xp_core::traits::{ActivityStore, RepoResult};
use xp_core::value_objects::Snowflake;

use crate::mappers::{count_from_db, count_to_db, entries_to_json};
use crate::models::{ActivityRecordModel, ScoreModel, VoiceSessionModel, WeeklyArchiveModel};

use super::error::{map_db_error, record_not_found};

const RECORD_COLUMNS: &str = "guild_id, user_id, total_xp, weekly_xp, level, \
     last_message_award_at, last_voice_award_at, voice_minutes, message_count";

/// PostgreSQL implementation of ActivityStore
#[derive(Clone)]
pub struct PgActivityStore {
    pool: PgPool,
}

impl PgActivityStore {
    /// Create a new PgActivityStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_archives(&self, guild_id: Snowflake, limit: Option<i64>) -> RepoResult<Vec<WeeklyArchive>> {
        let models = sqlx::query_as::<_, WeeklyArchiveModel>(
            r#"
            SELECT id, guild_id, week_start, week_end, entries, created_at
            FROM weekly_archives
            WHERE guild_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        models.into_iter().map(WeeklyArchive::try_from).collect()
    }

    async fn apply_award(
        &self,
        stamp_column: &'static str,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool> {
        let sql = format!(
            r#"
            UPDATE activity_records
            SET total_xp = total_xp + $3, weekly_xp = weekly_xp + $3, {stamp_column} = $4
            WHERE guild_id = $1 AND user_id = $2
            "#
        );

        let result = sqlx::query(&sql)
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .bind(count_to_db(xp))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ActivityStore for PgActivityStore {
    #[instrument(skip(self))]
    async fn get(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<ActivityRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM activity_records WHERE guild_id = $1 AND user_id = $2");

        let result = sqlx::query_as::<_, ActivityRecordModel>(&sql)
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.map(ActivityRecord::from))
    }

    #[instrument(skip(self))]
    async fn get_or_create(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<ActivityRecord> {
        sqlx::query(
            r#"
            INSERT INTO activity_records (guild_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (guild_id, user_id) DO NOTHING
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.get(guild_id, user_id)
            .await?
            .ok_or_else(|| record_not_found(guild_id, user_id))
    }

    #[instrument(skip(self))]
    async fn apply_message_award(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool> {
        self.apply_award("last_message_award_at", guild_id, user_id, xp, now)
            .await
    }

    #[instrument(skip(self))]
    async fn apply_voice_award(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool> {
        self.apply_award("last_voice_award_at", guild_id, user_id, xp, now)
            .await
    }

    #[instrument(skip(self))]
    async fn set_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        total_xp: u64,
        weekly_xp: Option<u64>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activity_records
            SET total_xp = $3, weekly_xp = COALESCE($4, weekly_xp)
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(count_to_db(total_xp))
        .bind(weekly_xp.map(count_to_db))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_weekly_xp(&self, guild_id: Snowflake, user_id: Snowflake, weekly_xp: u64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activity_records SET weekly_xp = $3
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(count_to_db(weekly_xp))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn set_level(&self, guild_id: Snowflake, user_id: Snowflake, level: u32) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activity_records SET level = $3
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(i32::try_from(level).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn reset_all(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activity_records
            SET total_xp = 0, weekly_xp = 0, level = 1,
                last_message_award_at = 0, last_voice_award_at = 0,
                voice_minutes = 0, message_count = 0
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn increment_voice_minutes(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        minutes: u64,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activity_records SET voice_minutes = voice_minutes + $3
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(count_to_db(minutes))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn increment_message_count(&self, guild_id: Snowflake, user_id: Snowflake, n: u64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE activity_records SET message_count = message_count + $3
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(count_to_db(n))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn leaderboard(
        &self,
        guild_id: Snowflake,
        limit: u32,
        order: LeaderboardOrder,
    ) -> RepoResult<Vec<LeaderboardEntry>> {
        let column = order.column();
        let filter = match order {
            LeaderboardOrder::WeeklyXp => "AND weekly_xp > 0",
            LeaderboardOrder::TotalXp => "",
        };
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM activity_records \
             WHERE guild_id = $1 {filter} \
             ORDER BY {column} DESC, user_id ASC \
             LIMIT $2"
        );

        let models = sqlx::query_as::<_, ActivityRecordModel>(&sql)
            .bind(guild_id.into_inner())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(models
            .into_iter()
            .map(ActivityRecord::from)
            .zip(1u32..)
            .map(|(record, rank)| LeaderboardEntry::from_record(rank, &record))
            .collect())
    }

    #[instrument(skip(self))]
    async fn rank_of(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        order: LeaderboardOrder,
    ) -> RepoResult<Option<u32>> {
        let column = order.column();
        let sql = format!(
            "SELECT 1 + (SELECT COUNT(*) FROM activity_records o \
                         WHERE o.guild_id = r.guild_id AND o.{column} > r.{column}) \
             FROM activity_records r \
             WHERE r.guild_id = $1 AND r.user_id = $2"
        );

        let rank = sqlx::query_scalar::<_, i64>(&sql)
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(rank.map(|r| u32::try_from(r).unwrap_or(u32::MAX)))
    }

    #[instrument(skip(self))]
    async fn rollover_weekly(&self, guild_id: Snowflake, now: DateTime<Utc>) -> RepoResult<WeeklyArchive> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let scores = sqlx::query_as::<_, ScoreModel>(
            r#"
            SELECT user_id, weekly_xp
            FROM activity_records
            WHERE guild_id = $1 AND weekly_xp > 0
            FOR UPDATE
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let entries = scores
            .into_iter()
            .map(|s| ArchiveEntry {
                user_id: Snowflake::new(s.user_id),
                weekly_xp: count_from_db(s.weekly_xp),
            })
            .collect();
        let mut archive = WeeklyArchive::for_week_ending(guild_id, now, entries);

        if !archive.is_empty() {
            archive.id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO weekly_archives (guild_id, week_start, week_end, entries, created_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(guild_id.into_inner())
            .bind(archive.week_start)
            .bind(archive.week_end)
            .bind(entries_to_json(&archive.entries)?)
            .bind(archive.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        sqlx::query(
            r#"
            UPDATE activity_records
            SET weekly_xp = 0, voice_minutes = 0, message_count = 0
            WHERE guild_id = $1
            "#,
        )
        .bind(guild_id.into_inner())
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;

        Ok(archive)
    }

    #[instrument(skip(self))]
    async fn weekly_archives(&self, guild_id: Snowflake, limit: u32) -> RepoResult<Vec<WeeklyArchive>> {
        self.fetch_archives(guild_id, Some(i64::from(limit))).await
    }

    #[instrument(skip(self))]
    async fn export(&self, guild_id: Snowflake) -> RepoResult<ActivitySnapshot> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM activity_records WHERE guild_id = $1 ORDER BY user_id");
        let records = sqlx::query_as::<_, ActivityRecordModel>(&sql)
            .bind(guild_id.into_inner())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(ActivitySnapshot {
            guild_id,
            exported_at: Utc::now(),
            records: records.into_iter().map(ActivityRecord::from).collect(),
            sessions: self.active_sessions(guild_id).await?,
            archives: self.fetch_archives(guild_id, None).await?,
        })
    }

    #[instrument(skip(self))]
    async fn start_session(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Snowflake,
        now: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO voice_sessions (guild_id, user_id, channel_id, joined_at, last_tick_at)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT (guild_id, user_id)
            DO UPDATE SET channel_id = EXCLUDED.channel_id, joined_at = EXCLUDED.joined_at, last_tick_at = 0
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(channel_id.into_inner())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn move_session(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE voice_sessions SET channel_id = $3
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(channel_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn end_session(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM voice_sessions WHERE guild_id = $1 AND user_id = $2")
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn active_sessions(&self, guild_id: Snowflake) -> RepoResult<Vec<VoiceSession>> {
        let models = sqlx::query_as::<_, VoiceSessionModel>(
            r#"
            SELECT guild_id, user_id, channel_id, joined_at, last_tick_at
            FROM voice_sessions
            WHERE guild_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(models.into_iter().map(VoiceSession::from).collect())
    }

    #[instrument(skip(self))]
    async fn touch_session_tick(&self, guild_id: Snowflake, user_id: Snowflake, now: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE voice_sessions SET last_tick_at = $3
            WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
