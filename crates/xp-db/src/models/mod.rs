//! Database models - SQLx-compatible structs for PostgreSQL tables

mod activity;
mod archive;
mod audit_log;
mod voice_session;

pub use activity::{ActivityRecordModel, ScoreModel};
pub use archive::WeeklyArchiveModel;
pub use audit_log::AuditLogModel;
pub use voice_session::VoiceSessionModel;
