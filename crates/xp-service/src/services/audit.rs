//! Audit sink that writes entries to the log

use async_trait::async_trait;
use xp_core::events::AuditEntry;
use xp_core::traits::AuditSink;

/// Logs every audit entry at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "xp_audit",
            kind = entry.kind.as_str(),
            guild_id = %entry.guild_id,
            user_id = ?entry.user_id.map(|u| u.into_inner()),
            role_id = ?entry.role_id.map(|r| r.into_inner()),
            reason = entry.reason.as_deref().unwrap_or(""),
            detail = %entry.detail,
            "Audit"
        );
    }
}
