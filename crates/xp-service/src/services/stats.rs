//! Stats service
//!
//! Read-only views: rank cards, leaderboards and past weekly archives.

use tracing::instrument;

use xp_core::{LeaderboardEntry, LeaderboardOrder, Snowflake, WeeklyArchive};

use crate::dto::UserStats;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Largest leaderboard page
pub const MAX_LEADERBOARD_LIMIT: u32 = 50;

/// Largest number of archives returned at once
pub const MAX_ARCHIVE_LIMIT: u32 = 52;

/// Stats service
pub struct StatsService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> StatsService<'a> {
    /// Create a new StatsService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// A member's level progress and ranks
    #[instrument(skip(self))]
    pub async fn user_stats(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<UserStats> {
        let store = self.ctx.store();
        let record = store
            .get(guild_id, user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("ActivityRecord", user_id.to_string()))?;

        let curve = self.ctx.settings().curve();
        let mut stats = UserStats::from_record(&record, &curve);

        stats.permanent_rank = store.rank_of(guild_id, user_id, LeaderboardOrder::TotalXp).await?;
        stats.weekly_rank = store.rank_of(guild_id, user_id, LeaderboardOrder::WeeklyXp).await?;

        Ok(stats)
    }

    /// Top members; `limit` is clamped to 1..=50
    #[instrument(skip(self))]
    pub async fn leaderboard(
        &self,
        guild_id: Snowflake,
        limit: u32,
        order: LeaderboardOrder,
    ) -> ServiceResult<Vec<LeaderboardEntry>> {
        let limit = limit.clamp(1, MAX_LEADERBOARD_LIMIT);
        Ok(self.ctx.store().leaderboard(guild_id, limit, order).await?)
    }

    /// Most recent weekly archives first
    #[instrument(skip(self))]
    pub async fn weekly_archives(&self, guild_id: Snowflake, limit: u32) -> ServiceResult<Vec<WeeklyArchive>> {
        let limit = limit.clamp(1, MAX_ARCHIVE_LIMIT);
        Ok(self.ctx.store().weekly_archives(guild_id, limit).await?)
    }
}
