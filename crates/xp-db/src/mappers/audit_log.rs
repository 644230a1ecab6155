//! AuditEntry entity <-> model mapper

use serde_json::Value as JsonValue;
use xp_core::events::{AuditEntry, AuditKind};
use xp_core::value_objects::Snowflake;

use crate::models::AuditLogModel;

impl TryFrom<AuditLogModel> for AuditEntry {
    type Error = xp_core::DomainError;

    fn try_from(model: AuditLogModel) -> Result<Self, Self::Error> {
        let kind: AuditKind = serde_json::from_value(JsonValue::String(model.action.clone()))
            .map_err(|_| {
                xp_core::DomainError::SerializationError(format!("unknown audit action {}", model.action))
            })?;

        Ok(AuditEntry {
            kind,
            guild_id: Snowflake::new(model.guild_id),
            user_id: model.user_id.map(Snowflake::new),
            role_id: model.role_id.map(Snowflake::new),
            reason: model.reason,
            detail: model.detail.unwrap_or(JsonValue::Null),
            created_at: model.created_at,
        })
    }
}
