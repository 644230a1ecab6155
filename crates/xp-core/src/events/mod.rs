//! Domain events - audit entries emitted when XP state changes

mod audit;

pub use audit::{AuditEntry, AuditKind};
