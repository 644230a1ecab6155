//! Repository implementations
//!
//! `ActivityStore` over PostgreSQL and over process memory, plus the
//! PostgreSQL-backed membership gateway and audit log.

mod activity;
mod audit_log;
mod error;
mod membership;
mod memory;

pub use activity::PgActivityStore;
pub use audit_log::PgAuditLog;
pub use membership::PgMembershipGateway;
pub use memory::MemoryActivityStore;
