//! Worker runtime
//!
//! Builds the service context on PostgreSQL, then runs the voice sweeper
//! until told to stop. Readiness and shutdown travel over `watch` channels so
//! the sweeper never starts against an empty guild cache by accident.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use xp_common::{AppConfig, AppError, SettingsStore};
use xp_db::{create_pool, run_migrations, PgActivityStore, PgAuditLog, PgMembershipGateway, PoolConfig};
use xp_service::{ActivityListener, GuildCache, ServiceContext, ServiceContextBuilder, VoiceSweeper};

/// Everything the leveling engine needs at run time
pub struct Runtime {
    listener: ActivityListener,
    sweeper: Arc<VoiceSweeper>,
    ready: watch::Sender<bool>,
    shutdown: watch::Sender<bool>,
}

impl Runtime {
    /// Connect to PostgreSQL, apply migrations, load settings and wire the
    /// PostgreSQL-backed collaborators
    pub async fn build(config: &AppConfig) -> Result<Self, AppError> {
        info!("Connecting to PostgreSQL...");
        let pool = create_pool(&PoolConfig::from(&config.database))
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        info!("PostgreSQL connection established");

        run_migrations(&pool, &config.worker.migrations_dir)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        info!(dir = %config.worker.migrations_dir.display(), "Migrations applied");

        let settings = Arc::new(SettingsStore::open(&config.worker.settings_path)?);
        let guild_id = settings.snapshot().guild_id;
        if guild_id.is_zero() {
            tracing::warn!("No guild configured; awards and sweeps are disabled until one is set");
        }

        let cache = GuildCache::new_shared();
        let ctx = ServiceContextBuilder::new()
            .store(Arc::new(PgActivityStore::new(pool.clone())))
            .gateway(Arc::new(PgMembershipGateway::new(pool.clone())))
            .directory(cache.clone())
            .audit(Arc::new(PgAuditLog::new(pool)))
            .settings(settings)
            .build()
            .map_err(AppError::from)?;

        info!(guild_id = %guild_id, "Service context ready");

        Ok(Self::new(
            ctx,
            cache,
            Duration::from_secs(config.worker.sweep_interval_secs),
        ))
    }

    /// Assemble a runtime around an existing context
    pub fn new(ctx: ServiceContext, cache: Arc<GuildCache>, sweep_interval: Duration) -> Self {
        let (ready, _) = watch::channel(false);
        let (shutdown, _) = watch::channel(false);

        Self {
            listener: ActivityListener::new(ctx.clone(), cache),
            sweeper: Arc::new(VoiceSweeper::new(ctx, sweep_interval)),
            ready,
            shutdown,
        }
    }

    /// Entry point for platform events
    pub fn listener(&self) -> &ActivityListener {
        &self.listener
    }

    pub fn context(&self) -> &ServiceContext {
        self.listener.context()
    }

    /// Let the sweeper start; call once the guild cache is populated
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Run the sweeper until `signal` completes, then stop it and wait for
    /// the sweep in progress to finish
    pub async fn run_until(&self, signal: impl Future<Output = ()>) -> Result<(), AppError> {
        let handle = Arc::clone(&self.sweeper).start(self.ready.subscribe(), self.shutdown.subscribe());
        info!("XP worker running");

        signal.await;

        info!("Shutdown requested");
        self.shutdown.send_replace(true);
        handle
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        info!("XP worker stopped");
        Ok(())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("ready", &self.is_ready())
            .field("sweeper_running", &self.sweeper.is_running())
            .finish_non_exhaustive()
    }
}
