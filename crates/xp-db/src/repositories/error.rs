//! Error handling utilities for repositories

use sqlx::Error as SqlxError;
use xp_core::error::DomainError;
use xp_core::value_objects::Snowflake;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Create a "record not found" error
pub fn record_not_found(guild_id: Snowflake, user_id: Snowflake) -> DomainError {
    DomainError::RecordNotFound { guild_id, user_id }
}
