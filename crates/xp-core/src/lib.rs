//! # xp-core
//!
//! Domain layer for the leveling engine: the XP↔level curve, activity records,
//! reward tiers, domain errors, and the traits the engine needs from storage,
//! the membership service, and the audit log.
//! This crate has zero dependencies on infrastructure (database, runtime, etc.).

pub mod curve;
pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use curve::{CurveAnchor, LevelCurve, LevelCurveConfig, MAX_TABLE_LEVEL};
pub use entities::{
    ActivityRecord, ActivitySnapshot, ArchiveEntry, LeaderboardEntry, LeaderboardOrder, Member,
    RewardTierMap, VoiceSession, WeeklyArchive,
};
pub use error::DomainError;
pub use events::{AuditEntry, AuditKind};
pub use traits::{
    ActivityStore, AuditSink, GuildDirectory, MembershipGateway, RepoResult, RoleOpError,
    RoleOpResult,
};
pub use value_objects::{Snowflake, SnowflakeParseError};
