//! Test fixtures and recording collaborators
//!
//! Provides reusable settings and fakes that remember every call.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use xp_common::LevelingSettings;
use xp_core::events::AuditEntry;
use xp_core::traits::{AuditSink, MembershipGateway, RoleOpError, RoleOpResult};
use xp_core::{AuditKind, CurveAnchor, LevelCurveConfig, Snowflake};

pub const GUILD: Snowflake = Snowflake::new(1_000);
pub const TEXT_CHANNEL: Snowflake = Snowflake::new(2_000);
pub const VOICE_CHANNEL: Snowflake = Snowflake::new(3_000);
pub const TIER_A: Snowflake = Snowflake::new(5_005);
pub const TIER_B: Snowflake = Snowflake::new(5_010);

/// A plausible unix timestamp to start scenarios from
pub const T0: i64 = 1_700_000_000;

/// Counter for unique test data
static COUNTER: AtomicI64 = AtomicI64::new(1);

/// A user id no other test in this run has used
pub fn unique_user() -> Snowflake {
    Snowflake::new(10_000 + COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// A guild id no other test run has used, for tests over a shared database
pub fn unique_guild() -> Snowflake {
    let base = chrono::Utc::now().timestamp_micros() << 8;
    Snowflake::new(base + COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Fixed 25 XP awards, 15 s message cooldown, 60 s voice tick, anchors
/// (5, 7500) (10, 60000) and tiers {5: A, 10: B}
pub fn tiered_settings() -> LevelingSettings {
    let mut settings = LevelingSettings::default();
    settings.guild_id = GUILD;
    settings.message.xp_min = 25;
    settings.message.xp_max = 25;
    settings.message.cooldown_seconds = 15;
    settings.message.whitelisted_channels.insert(TEXT_CHANNEL);
    settings.voice.xp_min = 25;
    settings.voice.xp_max = 25;
    settings.voice.tick_interval_seconds = 60;
    settings.voice.whitelisted_channels.insert(VOICE_CHANNEL);
    settings.level_curve = LevelCurveConfig::anchors(vec![
        CurveAnchor::new(5, 7_500),
        CurveAnchor::new(10, 60_000),
    ]);
    settings.role_rewards = [(5, TIER_A), (10, TIER_B)].into_iter().collect();
    settings
}

/// One role mutation seen by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCall {
    Add(Snowflake, Snowflake),
    Remove(Snowflake, Snowflake),
}

/// Membership gateway that records calls; roles in `forbidden` are refused
/// and roles in `failing` fail transiently
#[derive(Debug, Default)]
pub struct RecordingGateway {
    roles: Mutex<HashMap<Snowflake, HashSet<Snowflake>>>,
    calls: Mutex<Vec<RoleCall>>,
    forbidden: Mutex<HashSet<Snowflake>>,
    failing: Mutex<HashSet<Snowflake>>,
}

impl RecordingGateway {
    pub fn give(&self, user_id: Snowflake, role_id: Snowflake) {
        self.roles.lock().entry(user_id).or_default().insert(role_id);
    }

    pub fn roles_of(&self, user_id: Snowflake) -> HashSet<Snowflake> {
        self.roles.lock().get(&user_id).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RoleCall> {
        self.calls.lock().clone()
    }

    pub fn forbid(&self, role_id: Snowflake) {
        self.forbidden.lock().insert(role_id);
    }

    pub fn fail(&self, role_id: Snowflake) {
        self.failing.lock().insert(role_id);
    }

    /// Clear both refusal lists
    pub fn heal(&self) {
        self.forbidden.lock().clear();
        self.failing.lock().clear();
    }

    fn check(&self, role_id: Snowflake) -> RoleOpResult<()> {
        if self.forbidden.lock().contains(&role_id) {
            return Err(RoleOpError::Forbidden(format!("missing permission for {role_id}")));
        }
        if self.failing.lock().contains(&role_id) {
            return Err(RoleOpError::Failed(format!("upstream error for {role_id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipGateway for RecordingGateway {
    async fn list_roles(&self, _guild_id: Snowflake, user_id: Snowflake) -> RoleOpResult<HashSet<Snowflake>> {
        Ok(self.roles_of(user_id))
    }

    async fn add_role(&self, _guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, _reason: &str) -> RoleOpResult<()> {
        self.check(role_id)?;
        self.calls.lock().push(RoleCall::Add(user_id, role_id));
        self.give(user_id, role_id);
        Ok(())
    }

    async fn remove_role(&self, _guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake, _reason: &str) -> RoleOpResult<()> {
        self.check(role_id)?;
        self.calls.lock().push(RoleCall::Remove(user_id, role_id));
        if let Some(roles) = self.roles.lock().get_mut(&user_id) {
            roles.remove(&role_id);
        }
        Ok(())
    }
}

/// Audit sink that keeps every entry
#[derive(Debug, Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn kinds_for(&self, user_id: Snowflake) -> Vec<AuditKind> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.user_id == Some(user_id))
            .map(|e| e.kind)
            .collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}
