//! Tier role reconciliation
//!
//! A member holds exactly one tier role: the one for the highest threshold
//! their level has reached. Reconciling removes every other tier role they
//! hold and grants the target when it is missing. Role mutations are best
//! effort; failures are logged and reported, and a later `sync` repairs them.

use std::collections::HashSet;

use tracing::instrument;

use xp_core::events::AuditEntry;
use xp_core::traits::RoleOpError;
use xp_core::Snowflake;

use crate::dto::{ReconcileReport, RoleAction, RoleFailure};

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Tier role reconciler
pub struct RoleReconciler<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoleReconciler<'a> {
    /// Create a new RoleReconciler
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Bring the member's tier roles in line with `new_level`
    ///
    /// A grant while `new_level > old_level` is announced as a reward unlock.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        old_level: u32,
        new_level: u32,
    ) -> ReconcileReport {
        let tiers = self.ctx.settings().snapshot().role_rewards.clone();
        let target = tiers.role_for_level(new_level);
        let mut report = ReconcileReport {
            target,
            ..ReconcileReport::default()
        };

        if tiers.is_empty() {
            return report;
        }

        let gateway = self.ctx.gateway();
        let audit = self.ctx.audit();

        let held: HashSet<Snowflake> = match gateway.list_roles(guild_id, user_id).await {
            Ok(roles) => roles.intersection(&tiers.role_set()).copied().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list member roles; assuming no tier roles held");
                HashSet::new()
            }
        };

        let mut stale: Vec<Snowflake> = held.iter().copied().filter(|r| Some(*r) != target).collect();
        stale.sort();

        let reason = change_reason(old_level, new_level);
        let remove_reason = format!("{reason}: tier role replaced");
        for role_id in stale {
            match gateway.remove_role(guild_id, user_id, role_id, &remove_reason).await {
                Ok(()) => {
                    audit
                        .record(AuditEntry::role_removed(guild_id, user_id, role_id, &remove_reason))
                        .await;
                    report.removed.push(role_id);
                }
                Err(e) => {
                    log_role_failure(&e, role_id, RoleAction::Remove);
                    report.failures.push(RoleFailure::new(role_id, RoleAction::Remove, &e));
                }
            }
        }

        if let Some(role_id) = target.filter(|t| !held.contains(t)) {
            let grant_reason = format!("{reason}: tier reward");
            match gateway.add_role(guild_id, user_id, role_id, &grant_reason).await {
                Ok(()) => {
                    audit
                        .record(AuditEntry::role_granted(guild_id, user_id, role_id, &grant_reason))
                        .await;
                    if new_level > old_level {
                        audit
                            .record(AuditEntry::reward_unlocked(guild_id, user_id, role_id, new_level))
                            .await;
                    }
                    report.granted.push(role_id);
                }
                Err(e) => {
                    log_role_failure(&e, role_id, RoleAction::Grant);
                    report.failures.push(RoleFailure::new(role_id, RoleAction::Grant, &e));
                }
            }
        }

        if report.changed() {
            tracing::info!(
                guild_id = %guild_id,
                user_id = %user_id,
                level = new_level,
                granted = report.granted.len(),
                removed = report.removed.len(),
                "Tier roles reconciled"
            );
        }

        report
    }

    /// Reconcile against the stored level; no record means nothing to do
    #[instrument(skip(self))]
    pub async fn sync(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<ReconcileReport> {
        let Some(record) = self.ctx.store().get(guild_id, user_id).await? else {
            return Ok(ReconcileReport::default());
        };

        Ok(self.reconcile(guild_id, user_id, record.level, record.level).await)
    }
}

/// Audit and platform reason for a level transition
fn change_reason(old_level: u32, new_level: u32) -> String {
    match new_level.cmp(&old_level) {
        std::cmp::Ordering::Greater => format!("Level up: {old_level} → {new_level}"),
        std::cmp::Ordering::Less => format!("Level down: {old_level} → {new_level}"),
        std::cmp::Ordering::Equal => format!("Level sync: {new_level}"),
    }
}

fn log_role_failure(error: &RoleOpError, role_id: Snowflake, action: RoleAction) {
    if error.is_forbidden() {
        tracing::warn!(error = %error, role_id = %role_id, action = ?action, "Tier role change refused");
    } else {
        tracing::error!(error = %error, role_id = %role_id, action = ?action, "Tier role change failed");
    }
}
