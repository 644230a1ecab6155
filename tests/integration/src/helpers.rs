//! Test helpers for integration tests
//!
//! `TestWorld` wires the services to recording collaborators over either the
//! in-memory store or PostgreSQL (when `DATABASE_URL` is set).

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use xp_common::{LevelingSettings, SettingsStore};
use xp_core::traits::ActivityStore;
use xp_core::{ActivityRecord, Member, Snowflake};
use xp_db::{create_pool, run_migrations, MemoryActivityStore, PgActivityStore, PoolConfig};
use xp_service::{ActivityListener, GuildCache, ServiceContext};

use crate::fixtures::{tiered_settings, unique_guild, RecordingAudit, RecordingGateway, VOICE_CHANNEL};

/// Services plus handles on every collaborator
pub struct TestWorld {
    pub guild: Snowflake,
    pub ctx: ServiceContext,
    pub store: Arc<dyn ActivityStore>,
    pub gateway: Arc<RecordingGateway>,
    pub audit: Arc<RecordingAudit>,
    pub cache: Arc<GuildCache>,
    pub settings: Arc<SettingsStore>,
    pub listener: ActivityListener,
}

impl TestWorld {
    /// In-memory world with `tiered_settings`
    pub fn new() -> Self {
        Self::with_settings(tiered_settings())
    }

    pub fn with_settings(settings: LevelingSettings) -> Self {
        Self::with_store(Arc::new(MemoryActivityStore::new()), settings)
    }

    /// World over a migrated PostgreSQL database, or `None` without one
    ///
    /// The guild id is replaced with one no earlier run has used.
    pub async fn postgres(mut settings: LevelingSettings) -> Option<Self> {
        if !check_test_env() {
            return None;
        }
        settings.guild_id = unique_guild();
        match pg_store().await {
            Ok(store) => Some(Self::with_store(Arc::new(store), settings)),
            Err(e) => {
                eprintln!("Skipping test: database unavailable: {e}");
                None
            }
        }
    }

    fn with_store(store: Arc<dyn ActivityStore>, settings: LevelingSettings) -> Self {
        let gateway = Arc::new(RecordingGateway::default());
        let audit = Arc::new(RecordingAudit::default());
        let cache = GuildCache::new_shared();
        let guild_id = settings.guild_id;
        let settings = Arc::new(SettingsStore::new(settings));

        let snapshot = settings.snapshot();
        for channel in snapshot
            .message
            .whitelisted_channels
            .iter()
            .chain(&snapshot.voice.whitelisted_channels)
        {
            cache.add_channel(guild_id, *channel);
        }

        let ctx = ServiceContext::new(
            store.clone(),
            gateway.clone(),
            cache.clone(),
            audit.clone(),
            settings.clone(),
        );
        let listener = ActivityListener::new(ctx.clone(), cache.clone());

        Self {
            guild: guild_id,
            ctx,
            store,
            gateway,
            audit,
            cache,
            settings,
            listener,
        }
    }

    /// A human member of the configured guild, known to the cache
    pub fn member(&self, user_id: Snowflake) -> Member {
        let member = Member::new(self.guild, user_id);
        self.cache.upsert_member(member.clone());
        member
    }

    /// Join the member to the whitelisted voice channel
    pub async fn join_voice(&self, member: &Member, now: i64) {
        self.listener
            .on_voice_state_update(member, None, Some(VOICE_CHANNEL), now)
            .await;
    }

    pub async fn record(&self, user_id: Snowflake) -> Option<ActivityRecord> {
        self.store.get(self.guild, user_id).await.ok().flatten()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if the database test environment is configured
pub fn check_test_env() -> bool {
    dotenvy::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("Skipping test: DATABASE_URL not set");
        return false;
    }
    true
}

async fn pg_store() -> Result<PgActivityStore> {
    let pool = create_pool(&PoolConfig::from_env()).await?;
    let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    run_migrations(&pool, &migrations).await?;
    Ok(PgActivityStore::new(pool))
}
