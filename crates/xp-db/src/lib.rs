//! # xp-db
//!
//! Storage for the leveling engine.
//!
//! ## Overview
//!
//! - Connection pool management and migrations
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - `ActivityStore` implementations: PostgreSQL and in-memory
//! - PostgreSQL-backed membership gateway and audit log
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xp_db::{create_pool, run_migrations, PgActivityStore, PoolConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&PoolConfig::from_env()).await?;
//!     run_migrations(&pool, std::path::Path::new("./migrations")).await?;
//!     let store = PgActivityStore::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, run_migrations, PgPool, PoolConfig};
pub use repositories::{MemoryActivityStore, PgActivityStore, PgAuditLog, PgMembershipGateway};
