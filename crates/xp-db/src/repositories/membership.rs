//! PostgreSQL implementation of MembershipGateway
//!
//! Role grants live in `member_roles`; `guild_roles` says which roles exist
//! and whether the leveling system may hand them out.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use xp_core::traits::{MembershipGateway, RoleOpError, RoleOpResult};
use xp_core::value_objects::Snowflake;

/// PostgreSQL implementation of MembershipGateway
#[derive(Clone)]
pub struct PgMembershipGateway {
    pool: PgPool,
}

impl PgMembershipGateway {
    /// Create a new PgMembershipGateway
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fail unless the role exists and is assignable
    async fn check_assignable(&self, guild_id: Snowflake, role_id: Snowflake) -> RoleOpResult<()> {
        let assignable = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT assignable FROM guild_roles WHERE guild_id = $1 AND role_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(role_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(failed)?;

        match assignable {
            Some(true) => Ok(()),
            Some(false) => Err(RoleOpError::Forbidden(format!("role {role_id} is not assignable"))),
            None => Err(RoleOpError::Failed(format!("unknown role {role_id}"))),
        }
    }
}

fn failed(e: sqlx::Error) -> RoleOpError {
    RoleOpError::Failed(e.to_string())
}

#[async_trait]
impl MembershipGateway for PgMembershipGateway {
    #[instrument(skip(self))]
    async fn list_roles(&self, guild_id: Snowflake, user_id: Snowflake) -> RoleOpResult<HashSet<Snowflake>> {
        let role_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT role_id FROM member_roles WHERE guild_id = $1 AND user_id = $2
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(failed)?;

        Ok(role_ids.into_iter().map(Snowflake::new).collect())
    }

    #[instrument(skip(self))]
    async fn add_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: &str,
    ) -> RoleOpResult<()> {
        self.check_assignable(guild_id, role_id).await?;

        sqlx::query(
            r#"
            INSERT INTO member_roles (guild_id, user_id, role_id)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(role_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(failed)?;

        tracing::debug!(guild_id = %guild_id, user_id = %user_id, role_id = %role_id, reason, "Role granted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: &str,
    ) -> RoleOpResult<()> {
        self.check_assignable(guild_id, role_id).await?;

        sqlx::query(
            r#"
            DELETE FROM member_roles WHERE guild_id = $1 AND user_id = $2 AND role_id = $3
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(role_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(failed)?;

        tracing::debug!(guild_id = %guild_id, user_id = %user_id, role_id = %role_id, reason, "Role removed");
        Ok(())
    }
}
