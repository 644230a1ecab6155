//! In-memory implementation of ActivityStore
//!
//! One lock guards all state, so every operation (including the weekly
//! rollover) is atomic. Used by tests and single-process deployments that do
//! not need durability.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use xp_core::entities::{
    ActivityRecord, ActivitySnapshot, ArchiveEntry, LeaderboardEntry, LeaderboardOrder,
    VoiceSession, WeeklyArchive,
};
use xp_core::traits::{ActivityStore, RepoResult};
use xp_core::value_objects::Snowflake;

type Key = (Snowflake, Snowflake);

#[derive(Debug, Default)]
struct State {
    records: BTreeMap<Key, ActivityRecord>,
    sessions: BTreeMap<Key, VoiceSession>,
    /// Oldest first
    archives: Vec<WeeklyArchive>,
    next_archive_id: i64,
}

impl State {
    fn guild_records(&self, guild_id: Snowflake) -> impl Iterator<Item = &ActivityRecord> {
        self.records
            .range((guild_id, Snowflake::new(i64::MIN))..=(guild_id, Snowflake::new(i64::MAX)))
            .map(|(_, r)| r)
    }

    fn update_record(&mut self, key: Key, f: impl FnOnce(&mut ActivityRecord)) -> bool {
        match self.records.get_mut(&key) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }
}

/// ActivityStore kept in process memory
#[derive(Debug, Default)]
pub struct MemoryActivityStore {
    state: RwLock<State>,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record as-is
    pub fn insert_record(&self, record: ActivityRecord) {
        self.state
            .write()
            .records
            .insert((record.guild_id, record.user_id), record);
    }

    pub fn record_count(&self) -> usize {
        self.state.read().records.len()
    }
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn get(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<ActivityRecord>> {
        Ok(self.state.read().records.get(&(guild_id, user_id)).cloned())
    }

    async fn get_or_create(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<ActivityRecord> {
        let mut state = self.state.write();
        Ok(state
            .records
            .entry((guild_id, user_id))
            .or_insert_with(|| ActivityRecord::new(guild_id, user_id))
            .clone())
    }

    async fn apply_message_award(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool> {
        Ok(self.state.write().update_record((guild_id, user_id), |r| {
            r.total_xp = r.total_xp.saturating_add(xp);
            r.weekly_xp = r.weekly_xp.saturating_add(xp);
            r.last_message_award_at = now;
        }))
    }

    async fn apply_voice_award(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        xp: u64,
        now: i64,
    ) -> RepoResult<bool> {
        Ok(self.state.write().update_record((guild_id, user_id), |r| {
            r.total_xp = r.total_xp.saturating_add(xp);
            r.weekly_xp = r.weekly_xp.saturating_add(xp);
            r.last_voice_award_at = now;
        }))
    }

    async fn set_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        total_xp: u64,
        weekly_xp: Option<u64>,
    ) -> RepoResult<bool> {
        Ok(self.state.write().update_record((guild_id, user_id), |r| {
            r.total_xp = total_xp;
            if let Some(weekly) = weekly_xp {
                r.weekly_xp = weekly;
            }
        }))
    }

    async fn set_weekly_xp(&self, guild_id: Snowflake, user_id: Snowflake, weekly_xp: u64) -> RepoResult<bool> {
        Ok(self
            .state
            .write()
            .update_record((guild_id, user_id), |r| r.weekly_xp = weekly_xp))
    }

    async fn set_level(&self, guild_id: Snowflake, user_id: Snowflake, level: u32) -> RepoResult<bool> {
        Ok(self
            .state
            .write()
            .update_record((guild_id, user_id), |r| r.level = level))
    }

    async fn reset_all(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        Ok(self
            .state
            .write()
            .update_record((guild_id, user_id), ActivityRecord::reset))
    }

    async fn increment_voice_minutes(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        minutes: u64,
    ) -> RepoResult<bool> {
        Ok(self.state.write().update_record((guild_id, user_id), |r| {
            r.voice_minutes = r.voice_minutes.saturating_add(minutes);
        }))
    }

    async fn increment_message_count(&self, guild_id: Snowflake, user_id: Snowflake, n: u64) -> RepoResult<bool> {
        Ok(self.state.write().update_record((guild_id, user_id), |r| {
            r.message_count = r.message_count.saturating_add(n);
        }))
    }

    async fn leaderboard(
        &self,
        guild_id: Snowflake,
        limit: u32,
        order: LeaderboardOrder,
    ) -> RepoResult<Vec<LeaderboardEntry>> {
        let state = self.state.read();

        // records iterate in user id order, and the sort is stable
        let mut ranked: Vec<&ActivityRecord> = state
            .guild_records(guild_id)
            .filter(|r| order != LeaderboardOrder::WeeklyXp || r.weekly_xp > 0)
            .collect();
        ranked.sort_by(|a, b| order.score(b).cmp(&order.score(a)));

        Ok(ranked
            .into_iter()
            .take(limit as usize)
            .zip(1u32..)
            .map(|(record, rank)| LeaderboardEntry::from_record(rank, record))
            .collect())
    }

    async fn rank_of(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        order: LeaderboardOrder,
    ) -> RepoResult<Option<u32>> {
        let state = self.state.read();
        let Some(record) = state.records.get(&(guild_id, user_id)) else {
            return Ok(None);
        };

        let score = order.score(record);
        let above = state
            .guild_records(guild_id)
            .filter(|r| order.score(r) > score)
            .count();
        Ok(Some(u32::try_from(above).unwrap_or(u32::MAX).saturating_add(1)))
    }

    async fn rollover_weekly(&self, guild_id: Snowflake, now: DateTime<Utc>) -> RepoResult<WeeklyArchive> {
        let mut state = self.state.write();

        let entries = state
            .guild_records(guild_id)
            .filter(|r| r.weekly_xp > 0)
            .map(|r| ArchiveEntry {
                user_id: r.user_id,
                weekly_xp: r.weekly_xp,
            })
            .collect();
        let mut archive = WeeklyArchive::for_week_ending(guild_id, now, entries);

        if !archive.is_empty() {
            state.next_archive_id += 1;
            archive.id = state.next_archive_id;
            state.archives.push(archive.clone());
        }

        for (_, record) in state
            .records
            .range_mut((guild_id, Snowflake::new(i64::MIN))..=(guild_id, Snowflake::new(i64::MAX)))
        {
            record.weekly_xp = 0;
            record.voice_minutes = 0;
            record.message_count = 0;
        }

        Ok(archive)
    }

    async fn weekly_archives(&self, guild_id: Snowflake, limit: u32) -> RepoResult<Vec<WeeklyArchive>> {
        Ok(self
            .state
            .read()
            .archives
            .iter()
            .rev()
            .filter(|a| a.guild_id == guild_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn export(&self, guild_id: Snowflake) -> RepoResult<ActivitySnapshot> {
        let state = self.state.read();

        Ok(ActivitySnapshot {
            guild_id,
            exported_at: Utc::now(),
            records: state.guild_records(guild_id).cloned().collect(),
            sessions: state
                .sessions
                .values()
                .filter(|s| s.guild_id == guild_id)
                .cloned()
                .collect(),
            archives: state
                .archives
                .iter()
                .rev()
                .filter(|a| a.guild_id == guild_id)
                .cloned()
                .collect(),
        })
    }

    async fn start_session(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Snowflake,
        now: i64,
    ) -> RepoResult<()> {
        self.state.write().sessions.insert(
            (guild_id, user_id),
            VoiceSession::new(guild_id, user_id, channel_id, now),
        );
        Ok(())
    }

    async fn move_session(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> RepoResult<bool> {
        match self.state.write().sessions.get_mut(&(guild_id, user_id)) {
            Some(session) => {
                session.channel_id = channel_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn end_session(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        Ok(self
            .state
            .write()
            .sessions
            .remove(&(guild_id, user_id))
            .is_some())
    }

    async fn active_sessions(&self, guild_id: Snowflake) -> RepoResult<Vec<VoiceSession>> {
        Ok(self
            .state
            .read()
            .sessions
            .values()
            .filter(|s| s.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn touch_session_tick(&self, guild_id: Snowflake, user_id: Snowflake, now: i64) -> RepoResult<bool> {
        match self.state.write().sessions.get_mut(&(guild_id, user_id)) {
            Some(session) => {
                session.last_tick_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
