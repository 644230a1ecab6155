//! Audit entries
//!
//! Emitted for every level-up, reward role change and admin override. Sinks
//! decide where they go (log stream, `audit_logs` table, an announcements
//! channel for `REWARD_UNLOCKED`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::value_objects::Snowflake;

/// Kind of audited change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    LevelUp,
    RoleGranted,
    RoleRemoved,
    /// A reward role was granted as part of a level-up (announcement worthy)
    RewardUnlocked,
    XpSet,
    WeeklyXpSet,
    LevelSet,
    RecordReset,
    WeeklyRollover,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LevelUp => "LEVEL_UP",
            Self::RoleGranted => "ROLE_GRANTED",
            Self::RoleRemoved => "ROLE_REMOVED",
            Self::RewardUnlocked => "REWARD_UNLOCKED",
            Self::XpSet => "XP_SET",
            Self::WeeklyXpSet => "WEEKLY_XP_SET",
            Self::LevelSet => "LEVEL_SET",
            Self::RecordReset => "RECORD_RESET",
            Self::WeeklyRollover => "WEEKLY_ROLLOVER",
        }
    }
}

/// One audited change; the actor is always the leveling system itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub kind: AuditKind,
    pub guild_id: Snowflake,
    pub user_id: Option<Snowflake>,
    pub role_id: Option<Snowflake>,
    pub reason: Option<String>,
    pub detail: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(kind: AuditKind, guild_id: Snowflake) -> Self {
        Self {
            kind,
            guild_id,
            user_id: None,
            role_id: None,
            reason: None,
            detail: JsonValue::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_user(mut self, user_id: Snowflake) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_role(mut self, role_id: Snowflake) -> Self {
        self.role_id = Some(role_id);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_detail(mut self, detail: JsonValue) -> Self {
        self.detail = detail;
        self
    }

    pub fn level_up(guild_id: Snowflake, user_id: Snowflake, old_level: u32, new_level: u32, total_xp: u64) -> Self {
        Self::new(AuditKind::LevelUp, guild_id)
            .with_user(user_id)
            .with_detail(json!({
                "old_level": old_level,
                "new_level": new_level,
                "total_xp": total_xp,
            }))
    }

    pub fn role_granted(guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, reason: &str) -> Self {
        Self::new(AuditKind::RoleGranted, guild_id)
            .with_user(user_id)
            .with_role(role_id)
            .with_reason(reason)
    }

    pub fn role_removed(guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, reason: &str) -> Self {
        Self::new(AuditKind::RoleRemoved, guild_id)
            .with_user(user_id)
            .with_role(role_id)
            .with_reason(reason)
    }

    pub fn reward_unlocked(guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, level: u32) -> Self {
        Self::new(AuditKind::RewardUnlocked, guild_id)
            .with_user(user_id)
            .with_role(role_id)
            .with_detail(json!({ "level": level }))
    }
}
