//! Weekly archives and full exports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ActivityRecord, VoiceSession};
use crate::value_objects::Snowflake;

/// One member's weekly total at rollover time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub user_id: Snowflake,
    pub weekly_xp: u64,
}

/// Snapshot taken by a weekly rollover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyArchive {
    /// Storage id; `0` when nothing was written (empty week)
    pub id: i64,
    pub guild_id: Snowflake,
    pub week_start: DateTime<Utc>,
    pub week_end: DateTime<Utc>,
    /// Ordered by weekly XP, highest first
    pub entries: Vec<ArchiveEntry>,
    pub created_at: DateTime<Utc>,
}

impl WeeklyArchive {
    /// Build an archive for the week ending at `now`
    pub fn for_week_ending(
        guild_id: Snowflake,
        now: DateTime<Utc>,
        mut entries: Vec<ArchiveEntry>,
    ) -> Self {
        entries.sort_by(|a, b| b.weekly_xp.cmp(&a.weekly_xp).then(a.user_id.cmp(&b.user_id)));
        Self {
            id: 0,
            guild_id,
            week_start: now - chrono::Duration::days(7),
            week_end: now,
            entries,
            created_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of archived weekly XP
    pub fn total_xp(&self) -> u64 {
        self.entries.iter().map(|e| e.weekly_xp).fold(0, u64::saturating_add)
    }
}

/// Everything stored for one guild (admin backup)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub guild_id: Snowflake,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<ActivityRecord>,
    pub sessions: Vec<VoiceSession>,
    pub archives: Vec<WeeklyArchive>,
}
