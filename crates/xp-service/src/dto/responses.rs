//! Response DTOs
//!
//! Snowflake IDs are serialized as strings.

use serde::Serialize;
use xp_core::{ActivityRecord, LevelCurve, RoleOpError, Snowflake};

// ============================================================================
// Stats
// ============================================================================

/// A member's standing, as shown by a rank card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_id: Snowflake,
    pub total_xp: u64,
    pub weekly_xp: u64,
    pub level: u32,
    /// XP earned inside the current level
    pub xp_progress: u64,
    /// XP between the current level and the next
    pub xp_needed: u64,
    /// Total XP at which the next level starts
    pub next_level_xp: u64,
    pub permanent_rank: Option<u32>,
    /// 1 + members with strictly more weekly XP
    pub weekly_rank: Option<u32>,
    pub progress_percentage: f64,
    pub voice_minutes: u64,
    pub message_count: u64,
}

impl UserStats {
    /// Compute level progress from a record; ranks are filled in by the caller
    #[allow(clippy::cast_precision_loss)]
    pub fn from_record(record: &ActivityRecord, curve: &LevelCurve) -> Self {
        let level = curve.level_for(record.total_xp);
        let floor = curve.xp_for(level);
        let next_level_xp = curve.xp_for(level.saturating_add(1));

        let xp_progress = record.total_xp.saturating_sub(floor);
        let xp_needed = next_level_xp.saturating_sub(floor);
        let progress_percentage = if xp_needed == 0 {
            100.0
        } else {
            (xp_progress as f64 / xp_needed as f64 * 100.0).min(100.0)
        };

        Self {
            user_id: record.user_id,
            total_xp: record.total_xp,
            weekly_xp: record.weekly_xp,
            level,
            xp_progress,
            xp_needed,
            next_level_xp,
            permanent_rank: None,
            weekly_rank: None,
            progress_percentage,
            voice_minutes: record.voice_minutes,
            message_count: record.message_count,
        }
    }
}

// ============================================================================
// Role reconciliation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleAction {
    Grant,
    Remove,
}

/// A role mutation the gateway refused or could not perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleFailure {
    pub role_id: Snowflake,
    pub action: RoleAction,
    pub forbidden: bool,
    pub message: String,
}

impl RoleFailure {
    pub fn new(role_id: Snowflake, action: RoleAction, error: &RoleOpError) -> Self {
        Self {
            role_id,
            action,
            forbidden: error.is_forbidden(),
            message: error.to_string(),
        }
    }
}

/// What one reconciliation pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Tier role the member should hold; `None` below the first tier
    pub target: Option<Snowflake>,
    pub granted: Vec<Snowflake>,
    pub removed: Vec<Snowflake>,
    pub failures: Vec<RoleFailure>,
}

impl ReconcileReport {
    /// Nothing failed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// At least one role was added or removed
    pub fn changed(&self) -> bool {
        !self.granted.is_empty() || !self.removed.is_empty()
    }
}

// ============================================================================
// Voice
// ============================================================================

/// Effect of one voice state update on the member's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceTransition {
    Started,
    Moved,
    Ended,
    Ignored,
}

/// Counters from one voice sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Sessions looked at
    pub examined: usize,
    pub awarded: usize,
    /// Sessions closed because the member left or the channel went away
    pub ended_stale: usize,
    /// Not due yet, or the award was skipped
    pub skipped: usize,
    pub failed: usize,
}
