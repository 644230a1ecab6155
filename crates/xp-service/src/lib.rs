//! # xp-service
//!
//! Application layer: the award engine, tier-role reconciliation, voice
//! session tracking, and the admin/stats surfaces built on top of them.

pub mod cache;
pub mod dto;
pub mod services;

pub use cache::GuildCache;
pub use dto::{ReconcileReport, RoleAction, RoleFailure, SweepReport, UserStats, VoiceTransition};
pub use services::{
    ActivityListener, AdminService, AwardDecision, AwardOutcome, RoleReconciler, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, SkipReason, StatsService,
    TracingAuditSink, VoiceSweeper, VoiceTracker, XpEngine,
};
