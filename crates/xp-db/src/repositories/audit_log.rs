//! PostgreSQL audit log

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use xp_core::events::AuditEntry;
use xp_core::traits::{AuditSink, RepoResult};
use xp_core::value_objects::Snowflake;

use crate::models::AuditLogModel;

use super::error::map_db_error;

/// Writes audit entries to the `audit_logs` table
///
/// Delivery failures are logged and dropped.
#[derive(Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    /// Create a new PgAuditLog
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self, entry), fields(kind = entry.kind.as_str()))]
    pub async fn insert(&self, entry: &AuditEntry) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO audit_logs (guild_id, user_id, role_id, action, reason, detail, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.guild_id.into_inner())
        .bind(entry.user_id.map(Snowflake::into_inner))
        .bind(entry.role_id.map(Snowflake::into_inner))
        .bind(entry.kind.as_str())
        .bind(entry.reason.as_deref())
        .bind((!entry.detail.is_null()).then_some(&entry.detail))
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    /// Most recent entries for a guild, newest first
    #[instrument(skip(self))]
    pub async fn recent(&self, guild_id: Snowflake, limit: u32) -> RepoResult<Vec<AuditEntry>> {
        let models = sqlx::query_as::<_, AuditLogModel>(
            r#"
            SELECT id, guild_id, user_id, role_id, action, reason, detail, created_at
            FROM audit_logs
            WHERE guild_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(i64::from(limit.clamp(1, 100)))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        models.into_iter().map(AuditEntry::try_from).collect()
    }
}

#[async_trait]
impl AuditSink for PgAuditLog {
    async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.insert(&entry).await {
            tracing::error!(
                error = %e,
                guild_id = %entry.guild_id,
                kind = entry.kind.as_str(),
                "Failed to write audit entry"
            );
        }
    }
}
