//! Activity record - per-(guild, user) XP accumulators

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Per-member XP state
///
/// Timestamps are Unix seconds; `0` means "never awarded".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub total_xp: u64,
    pub weekly_xp: u64,
    /// Cached `LevelCurve::level_for(total_xp)`
    pub level: u32,
    pub last_message_award_at: i64,
    pub last_voice_award_at: i64,
    pub voice_minutes: u64,
    pub message_count: u64,
}

impl ActivityRecord {
    /// A fresh record: everything zeroed, level 1
    pub fn new(guild_id: Snowflake, user_id: Snowflake) -> Self {
        Self {
            guild_id,
            user_id,
            total_xp: 0,
            weekly_xp: 0,
            level: 1,
            last_message_award_at: 0,
            last_voice_award_at: 0,
            voice_minutes: 0,
            message_count: 0,
        }
    }

    /// Whether the message cooldown has passed at `now`
    #[inline]
    pub fn message_cooldown_elapsed(&self, now: i64, cooldown_secs: u64) -> bool {
        elapsed(self.last_message_award_at, now, cooldown_secs)
    }

    /// Whether the voice tick interval has passed at `now`
    #[inline]
    pub fn voice_interval_elapsed(&self, now: i64, interval_secs: u64) -> bool {
        elapsed(self.last_voice_award_at, now, interval_secs)
    }

    /// Zero all counters in place (admin reset)
    pub fn reset(&mut self) {
        *self = Self::new(self.guild_id, self.user_id);
    }
}

pub(crate) fn elapsed(since: i64, now: i64, window_secs: u64) -> bool {
    i128::from(now) - i128::from(since) >= i128::from(window_secs)
}

/// Leaderboard ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardOrder {
    /// Permanent XP
    TotalXp,
    /// This week's XP (only members with weekly XP are listed)
    WeeklyXp,
}

impl LeaderboardOrder {
    /// Column holding the score
    pub fn column(self) -> &'static str {
        match self {
            Self::TotalXp => "total_xp",
            Self::WeeklyXp => "weekly_xp",
        }
    }

    /// Score of a record under this ordering
    pub fn score(self, record: &ActivityRecord) -> u64 {
        match self {
            Self::TotalXp => record.total_xp,
            Self::WeeklyXp => record.weekly_xp,
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Dense, 1-based position
    pub rank: u32,
    pub user_id: Snowflake,
    pub total_xp: u64,
    pub weekly_xp: u64,
    pub level: u32,
    pub voice_minutes: u64,
    pub message_count: u64,
}

impl LeaderboardEntry {
    pub fn from_record(rank: u32, record: &ActivityRecord) -> Self {
        Self {
            rank,
            user_id: record.user_id,
            total_xp: record.total_xp,
            weekly_xp: record.weekly_xp,
            level: record.level,
            voice_minutes: record.voice_minutes,
            message_count: record.message_count,
        }
    }
}
