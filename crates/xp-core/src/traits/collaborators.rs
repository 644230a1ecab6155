//! Collaborator traits - the chat platform and audit log as seen by the engine

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::Member;
use crate::events::AuditEntry;
use crate::value_objects::Snowflake;

/// Why a role mutation did not happen
///
/// Both are non-fatal to the engine; they are kept apart so logs can tell a
/// missing permission (needs an operator) from a transient failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleOpError {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("role operation failed: {0}")]
    Failed(String),
}

impl RoleOpError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

/// Result type for membership operations
pub type RoleOpResult<T> = Result<T, RoleOpError>;

/// Role membership on the chat platform
#[async_trait]
pub trait MembershipGateway: Send + Sync {
    /// Roles the member currently holds
    async fn list_roles(&self, guild_id: Snowflake, user_id: Snowflake) -> RoleOpResult<HashSet<Snowflake>>;

    async fn add_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: &str,
    ) -> RoleOpResult<()>;

    async fn remove_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: &str,
    ) -> RoleOpResult<()>;
}

/// Read-only view of guild membership, channels and voice presence
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Member if they are still in the guild
    async fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member>;

    async fn channel_exists(&self, guild_id: Snowflake, channel_id: Snowflake) -> bool;

    /// Voice channel the member is connected to right now
    async fn voice_channel_of(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Snowflake>;
}

/// Fire-and-forget audit log
///
/// Implementations swallow their own delivery failures; the engine never
/// waits on, or branches on, the outcome.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}
