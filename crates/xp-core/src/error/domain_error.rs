//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("No activity record for user {user_id} in guild {guild_id}")]
    RecordNotFound {
        guild_id: Snowflake,
        user_id: Snowflake,
    },

    #[error("No voice session for user {user_id} in guild {guild_id}")]
    SessionNotFound {
        guild_id: Snowflake,
        user_id: Snowflake,
    },

    #[error("Role not found: {0}")]
    RoleNotFound(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid level curve: {0}")]
    InvalidCurve(String),

    #[error("Invalid level: {0} (levels start at 1)")]
    InvalidLevel(u32),

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for logs and command replies
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::RecordNotFound { .. } => "UNKNOWN_RECORD",
            Self::SessionNotFound { .. } => "UNKNOWN_SESSION",
            Self::RoleNotFound(_) => "UNKNOWN_ROLE",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidCurve(_) => "INVALID_CURVE",
            Self::InvalidLevel(_) => "INVALID_LEVEL",

            // Infrastructure
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound { .. } | Self::SessionNotFound { .. } | Self::RoleNotFound(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::InvalidCurve(_) | Self::InvalidLevel(_)
        )
    }

    /// Check if this came from the storage layer
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError(_) | Self::SerializationError(_) | Self::InternalError(_)
        )
    }
}
