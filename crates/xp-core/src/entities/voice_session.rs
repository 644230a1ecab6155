//! Voice session - one member's stay in an eligible voice channel

use serde::{Deserialize, Serialize};

use super::activity::elapsed;
use crate::value_objects::Snowflake;

/// Active voice session (at most one per member)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSession {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub joined_at: i64,
    /// Last sweep award; `0` until the first one
    pub last_tick_at: i64,
}

impl VoiceSession {
    pub fn new(guild_id: Snowflake, user_id: Snowflake, channel_id: Snowflake, now: i64) -> Self {
        Self {
            guild_id,
            user_id,
            channel_id,
            joined_at: now,
            last_tick_at: 0,
        }
    }

    /// Whether the sweep should try to award this session at `now`
    #[inline]
    pub fn tick_due(&self, now: i64, interval_secs: u64) -> bool {
        elapsed(self.last_tick_at, now, interval_secs)
    }

    /// Whole minutes earned since the last tick (or since joining), at least 1
    pub fn accrued_minutes(&self, now: i64) -> u64 {
        let since = self.last_tick_at.max(self.joined_at);
        let minutes = now.saturating_sub(since).max(0) / 60;
        u64::try_from(minutes).unwrap_or(0).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(joined_at: i64) -> VoiceSession {
        VoiceSession::new(Snowflake::new(1), Snowflake::new(2), Snowflake::new(3), joined_at)
    }

    #[test]
    fn test_first_tick_is_due_immediately() {
        let s = session(1_000);
        assert_eq!(s.last_tick_at, 0);
        assert!(s.tick_due(1_000, 60));
    }

    #[test]
    fn test_tick_interval() {
        let mut s = session(1_000);
        s.last_tick_at = 1_000;
        assert!(!s.tick_due(1_059, 60));
        assert!(s.tick_due(1_060, 60));
    }

    #[test]
    fn test_accrued_minutes_counts_from_join_before_first_tick() {
        let s = session(1_000);
        assert_eq!(s.accrued_minutes(1_000 + 185), 3);
    }

    #[test]
    fn test_accrued_minutes_minimum_one() {
        let mut s = session(1_000);
        s.last_tick_at = 1_100;
        assert_eq!(s.accrued_minutes(1_110), 1);
        assert_eq!(s.accrued_minutes(900), 1);
    }
}
