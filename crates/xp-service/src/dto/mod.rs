//! Data transfer objects returned by the services
//!
//! All types implement `Serialize` so a command surface can render them.

pub mod responses;

pub use responses::{ReconcileReport, RoleAction, RoleFailure, SweepReport, UserStats, VoiceTransition};
