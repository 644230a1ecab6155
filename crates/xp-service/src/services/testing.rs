//! Fakes shared by the unit tests in this crate

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use xp_common::{LevelingSettings, SettingsStore};
use xp_core::events::AuditEntry;
use xp_core::traits::{AuditSink, MembershipGateway, RepoResult, RoleOpError, RoleOpResult};
use xp_core::{
    ActivityRecord, ActivitySnapshot, ActivityStore, AuditKind, CurveAnchor, DomainError,
    LeaderboardEntry, LeaderboardOrder, LevelCurveConfig, Snowflake, VoiceSession, WeeklyArchive,
};
use xp_db::MemoryActivityStore;

use crate::cache::GuildCache;

use super::context::ServiceContext;

pub const GUILD: Snowflake = Snowflake::new(100);
pub const TEXT: Snowflake = Snowflake::new(200);
pub const VOICE: Snowflake = Snowflake::new(300);
pub const TIER_A: Snowflake = Snowflake::new(5_000);
pub const TIER_B: Snowflake = Snowflake::new(10_000);

/// Membership gateway backed by a map; roles in `forbidden` are refused
#[derive(Default)]
pub struct FakeGateway {
    pub roles: Mutex<HashMap<Snowflake, HashSet<Snowflake>>>,
    pub forbidden: Mutex<HashSet<Snowflake>>,
}

impl FakeGateway {
    pub fn roles_of(&self, user_id: Snowflake) -> HashSet<Snowflake> {
        self.roles.lock().get(&user_id).cloned().unwrap_or_default()
    }

    pub fn give(&self, user_id: Snowflake, role_id: Snowflake) {
        self.roles.lock().entry(user_id).or_default().insert(role_id);
    }
}

#[async_trait]
impl MembershipGateway for FakeGateway {
    async fn list_roles(&self, _guild_id: Snowflake, user_id: Snowflake) -> RoleOpResult<HashSet<Snowflake>> {
        Ok(self.roles_of(user_id))
    }

    async fn add_role(&self, _guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, _reason: &str) -> RoleOpResult<()> {
        if self.forbidden.lock().contains(&role_id) {
            return Err(RoleOpError::Forbidden(format!("cannot manage {role_id}")));
        }
        self.give(user_id, role_id);
        Ok(())
    }

    async fn remove_role(&self, _guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, _reason: &str) -> RoleOpResult<()> {
        if self.forbidden.lock().contains(&role_id) {
            return Err(RoleOpError::Forbidden(format!("cannot manage {role_id}")));
        }
        if let Some(roles) = self.roles.lock().get_mut(&user_id) {
            roles.remove(&role_id);
        }
        Ok(())
    }
}

/// Keeps every audit entry
#[derive(Default)]
pub struct FakeAudit {
    pub entries: Mutex<Vec<AuditEntry>>,
}

impl FakeAudit {
    pub fn kinds(&self) -> Vec<AuditKind> {
        self.entries.lock().iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl AuditSink for FakeAudit {
    async fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}

/// How award writes fail for a chosen member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardFault {
    /// The store reports an error
    Error,
    /// The store reports the record as missing
    Missing,
}

/// Memory store whose award writes fail for selected members
pub struct FaultyStore {
    inner: Arc<MemoryActivityStore>,
    faults: Mutex<HashMap<Snowflake, AwardFault>>,
    failing_reads: Mutex<HashSet<Snowflake>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<MemoryActivityStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
            failing_reads: Mutex::new(HashSet::new()),
        }
    }

    /// `get` errors for the member; `get_or_create` still works
    pub fn fail_reads(&self, user_id: Snowflake) {
        self.failing_reads.lock().insert(user_id);
    }

    pub fn fail_awards(&self, user_id: Snowflake, fault: AwardFault) {
        self.faults.lock().insert(user_id, fault);
    }

    fn fault(&self, user_id: Snowflake) -> RepoResult<Option<bool>> {
        match self.faults.lock().get(&user_id) {
            Some(AwardFault::Error) => Err(DomainError::DatabaseError("connection reset".to_string())),
            Some(AwardFault::Missing) => Ok(Some(false)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ActivityStore for FaultyStore {
    async fn get(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<ActivityRecord>> {
        if self.failing_reads.lock().contains(&user_id) {
            return Err(DomainError::DatabaseError("read timed out".to_string()));
        }
        self.inner.get(guild_id, user_id).await
    }

    async fn get_or_create(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<ActivityRecord> {
        self.inner.get_or_create(guild_id, user_id).await
    }

    async fn apply_message_award(&self, guild_id: Snowflake, user_id: Snowflake, xp: u64, now: i64) -> RepoResult<bool> {
        if let Some(applied) = self.fault(user_id)? {
            return Ok(applied);
        }
        self.inner.apply_message_award(guild_id, user_id, xp, now).await
    }

    async fn apply_voice_award(&self, guild_id: Snowflake, user_id: Snowflake, xp: u64, now: i64) -> RepoResult<bool> {
        if let Some(applied) = self.fault(user_id)? {
            return Ok(applied);
        }
        self.inner.apply_voice_award(guild_id, user_id, xp, now).await
    }

    async fn set_xp(&self, guild_id: Snowflake, user_id: Snowflake, total_xp: u64, weekly_xp: Option<u64>) -> RepoResult<bool> {
        self.inner.set_xp(guild_id, user_id, total_xp, weekly_xp).await
    }

    async fn set_weekly_xp(&self, guild_id: Snowflake, user_id: Snowflake, weekly_xp: u64) -> RepoResult<bool> {
        self.inner.set_weekly_xp(guild_id, user_id, weekly_xp).await
    }

    async fn set_level(&self, guild_id: Snowflake, user_id: Snowflake, level: u32) -> RepoResult<bool> {
        self.inner.set_level(guild_id, user_id, level).await
    }

    async fn reset_all(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        self.inner.reset_all(guild_id, user_id).await
    }

    async fn increment_voice_minutes(&self, guild_id: Snowflake, user_id: Snowflake, minutes: u64) -> RepoResult<bool> {
        self.inner.increment_voice_minutes(guild_id, user_id, minutes).await
    }

    async fn increment_message_count(&self, guild_id: Snowflake, user_id: Snowflake, n: u64) -> RepoResult<bool> {
        self.inner.increment_message_count(guild_id, user_id, n).await
    }

    async fn leaderboard(&self, guild_id: Snowflake, limit: u32, order: LeaderboardOrder) -> RepoResult<Vec<LeaderboardEntry>> {
        self.inner.leaderboard(guild_id, limit, order).await
    }

    async fn rank_of(&self, guild_id: Snowflake, user_id: Snowflake, order: LeaderboardOrder) -> RepoResult<Option<u32>> {
        self.inner.rank_of(guild_id, user_id, order).await
    }

    async fn rollover_weekly(&self, guild_id: Snowflake, now: DateTime<Utc>) -> RepoResult<WeeklyArchive> {
        self.inner.rollover_weekly(guild_id, now).await
    }

    async fn weekly_archives(&self, guild_id: Snowflake, limit: u32) -> RepoResult<Vec<WeeklyArchive>> {
        self.inner.weekly_archives(guild_id, limit).await
    }

    async fn export(&self, guild_id: Snowflake) -> RepoResult<ActivitySnapshot> {
        self.inner.export(guild_id).await
    }

    async fn start_session(&self, guild_id: Snowflake, user_id: Snowflake, channel_id: Snowflake, now: i64) -> RepoResult<()> {
        self.inner.start_session(guild_id, user_id, channel_id, now).await
    }

    async fn move_session(&self, guild_id: Snowflake, user_id: Snowflake, channel_id: Snowflake) -> RepoResult<bool> {
        self.inner.move_session(guild_id, user_id, channel_id).await
    }

    async fn end_session(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        self.inner.end_session(guild_id, user_id).await
    }

    async fn active_sessions(&self, guild_id: Snowflake) -> RepoResult<Vec<VoiceSession>> {
        self.inner.active_sessions(guild_id).await
    }

    async fn touch_session_tick(&self, guild_id: Snowflake, user_id: Snowflake, now: i64) -> RepoResult<bool> {
        self.inner.touch_session_tick(guild_id, user_id, now).await
    }
}

pub struct Harness {
    pub ctx: ServiceContext,
    pub store: Arc<MemoryActivityStore>,
    pub gateway: Arc<FakeGateway>,
    pub audit: Arc<FakeAudit>,
    pub cache: Arc<GuildCache>,
    pub settings: Arc<SettingsStore>,
}

/// Settings: 25 XP per award, 15 s message cooldown, 60 s voice tick,
/// anchors (5, 7500) (10, 60000), tiers {5: A, 10: B}
pub fn settings() -> LevelingSettings {
    let mut settings = LevelingSettings::default();
    settings.guild_id = GUILD;
    settings.message.whitelisted_channels.insert(TEXT);
    settings.voice.whitelisted_channels.insert(VOICE);
    settings.level_curve = LevelCurveConfig::anchors(vec![
        CurveAnchor::new(5, 7_500),
        CurveAnchor::new(10, 60_000),
    ]);
    settings.role_rewards = [(5, TIER_A), (10, TIER_B)].into_iter().collect();
    settings
}

pub fn harness() -> Harness {
    let store = Arc::new(MemoryActivityStore::new());
    build_harness(store.clone(), store)
}

/// Harness whose context writes through a `FaultyStore`; `Harness::store`
/// is the memory store underneath
pub fn faulty_harness() -> (Harness, Arc<FaultyStore>) {
    let store = Arc::new(MemoryActivityStore::new());
    let faulty = Arc::new(FaultyStore::new(store.clone()));
    (build_harness(store, faulty.clone()), faulty)
}

fn build_harness(store: Arc<MemoryActivityStore>, ctx_store: Arc<dyn ActivityStore>) -> Harness {
    let gateway = Arc::new(FakeGateway::default());
    let audit = Arc::new(FakeAudit::default());
    let cache = Arc::new(GuildCache::new());
    let settings = Arc::new(SettingsStore::new(settings()));

    cache.add_channel(GUILD, TEXT);
    cache.add_channel(GUILD, VOICE);

    let ctx = ServiceContext::new(
        ctx_store,
        gateway.clone(),
        cache.clone(),
        audit.clone(),
        settings.clone(),
    );

    Harness {
        ctx,
        store,
        gateway,
        audit,
        cache,
        settings,
    }
}
