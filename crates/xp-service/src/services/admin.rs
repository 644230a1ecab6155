//! Admin service
//!
//! Direct overrides of activity records plus weekly rollover and export.
//! Overrides never touch roles on their own; call `sync` afterwards.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, instrument};

use xp_core::events::{AuditEntry, AuditKind};
use xp_core::{ActivitySnapshot, DomainError, Snowflake, WeeklyArchive};

use crate::dto::ReconcileReport;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::reconciler::RoleReconciler;

/// Admin service
pub struct AdminService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AdminService<'a> {
    /// Create a new AdminService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Overwrite total XP (and weekly XP when given) and recompute the level
    #[instrument(skip(self))]
    pub async fn set_xp(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        total_xp: u64,
        weekly_xp: Option<u64>,
    ) -> ServiceResult<bool> {
        self.require_served(guild_id)?;
        let store = self.ctx.store();
        let curve = self.ctx.settings().curve();

        let before = store.get_or_create(guild_id, user_id).await?;
        if !store.set_xp(guild_id, user_id, total_xp, weekly_xp).await? {
            return Ok(false);
        }

        let level = curve.level_for(total_xp);
        store.set_level(guild_id, user_id, level).await?;

        self.audit(
            AuditEntry::new(AuditKind::XpSet, guild_id)
                .with_user(user_id)
                .with_detail(json!({
                    "old_xp": before.total_xp,
                    "new_xp": total_xp,
                    "old_level": before.level,
                    "new_level": level,
                    "old_weekly_xp": before.weekly_xp,
                    "new_weekly_xp": weekly_xp,
                })),
        )
        .await;

        info!(guild_id = %guild_id, user_id = %user_id, total_xp, ?weekly_xp, level, "XP set by admin");
        Ok(true)
    }

    /// Overwrite weekly XP only
    #[instrument(skip(self))]
    pub async fn set_weekly_xp(&self, guild_id: Snowflake, user_id: Snowflake, weekly_xp: u64) -> ServiceResult<bool> {
        self.require_served(guild_id)?;
        let store = self.ctx.store();

        let before = store.get_or_create(guild_id, user_id).await?;
        if !store.set_weekly_xp(guild_id, user_id, weekly_xp).await? {
            return Ok(false);
        }

        self.audit(
            AuditEntry::new(AuditKind::WeeklyXpSet, guild_id)
                .with_user(user_id)
                .with_detail(json!({
                    "old_weekly_xp": before.weekly_xp,
                    "new_weekly_xp": weekly_xp,
                })),
        )
        .await;

        info!(guild_id = %guild_id, user_id = %user_id, weekly_xp, "Weekly XP set by admin");
        Ok(true)
    }

    /// Put the member at the start of `level`: total XP becomes the
    /// level's threshold
    #[instrument(skip(self))]
    pub async fn set_level(&self, guild_id: Snowflake, user_id: Snowflake, level: u32) -> ServiceResult<bool> {
        self.require_served(guild_id)?;
        if level == 0 {
            return Err(DomainError::InvalidLevel(level).into());
        }

        let store = self.ctx.store();
        let curve = self.ctx.settings().curve();
        let total_xp = curve.xp_for(level);

        let before = store.get_or_create(guild_id, user_id).await?;
        if !store.set_xp(guild_id, user_id, total_xp, None).await? {
            return Ok(false);
        }
        store.set_level(guild_id, user_id, level).await?;

        self.audit(
            AuditEntry::new(AuditKind::LevelSet, guild_id)
                .with_user(user_id)
                .with_detail(json!({
                    "old_level": before.level,
                    "new_level": level,
                    "total_xp": total_xp,
                })),
        )
        .await;

        info!(guild_id = %guild_id, user_id = %user_id, level, total_xp, "Level set by admin");
        Ok(true)
    }

    /// Zero the member's record; false when they have none
    #[instrument(skip(self))]
    pub async fn reset_all(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<bool> {
        self.require_served(guild_id)?;

        let reset = self.ctx.store().reset_all(guild_id, user_id).await?;
        if reset {
            self.audit(AuditEntry::new(AuditKind::RecordReset, guild_id).with_user(user_id))
                .await;
            info!(guild_id = %guild_id, user_id = %user_id, "Activity record reset by admin");
        }

        Ok(reset)
    }

    /// Reconcile tier roles against the stored level
    #[instrument(skip(self))]
    pub async fn sync(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<ReconcileReport> {
        self.require_served(guild_id)?;
        RoleReconciler::new(self.ctx).sync(guild_id, user_id).await
    }

    /// Archive and zero the week's counters
    #[instrument(skip(self))]
    pub async fn rollover_weekly(&self, guild_id: Snowflake, now: DateTime<Utc>) -> ServiceResult<WeeklyArchive> {
        self.require_served(guild_id)?;

        let archive = self.ctx.store().rollover_weekly(guild_id, now).await?;

        self.audit(AuditEntry::new(AuditKind::WeeklyRollover, guild_id).with_detail(json!({
            "archive_id": archive.id,
            "members": archive.entries.len(),
            "total_xp": archive.total_xp(),
        })))
        .await;

        info!(
            guild_id = %guild_id,
            members = archive.entries.len(),
            "Weekly rollover complete"
        );
        Ok(archive)
    }

    /// Everything stored for the guild
    #[instrument(skip(self))]
    pub async fn export(&self, guild_id: Snowflake) -> ServiceResult<ActivitySnapshot> {
        self.require_served(guild_id)?;
        Ok(self.ctx.store().export(guild_id).await?)
    }

    fn require_served(&self, guild_id: Snowflake) -> ServiceResult<()> {
        if self.ctx.settings().snapshot().serves(guild_id) {
            Ok(())
        } else {
            Err(ServiceError::validation(format!("guild {guild_id} is not configured for leveling")))
        }
    }

    async fn audit(&self, entry: AuditEntry) {
        self.ctx.audit().record(entry).await;
    }
}
