//! Business logic services
//!
//! Every service borrows a `ServiceContext`; long-lived tasks (the listener
//! and the voice sweeper) own a clone of it and build services per event.

pub mod admin;
pub mod audit;
pub mod context;
pub mod engine;
pub mod error;
pub mod listener;
pub mod reconciler;
pub mod stats;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

// Re-export all services for convenience
pub use admin::AdminService;
pub use audit::TracingAuditSink;
pub use context::{ServiceContext, ServiceContextBuilder};
pub use engine::{AwardDecision, AwardOutcome, SkipReason, XpEngine};
pub use error::{ServiceError, ServiceResult};
pub use listener::ActivityListener;
pub use reconciler::RoleReconciler;
pub use stats::StatsService;
pub use voice::{VoiceSweeper, VoiceTracker};
