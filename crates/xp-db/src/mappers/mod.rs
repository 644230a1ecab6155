//! Model to entity mappers
//!
//! - `From<Model> for Entity` / `TryFrom` where a JSON column must parse
//! - Counter conversions between `u64` entity fields and `BIGINT` columns

mod activity;
mod archive;
mod audit_log;

pub use activity::{count_from_db, count_to_db};
pub use archive::entries_to_json;
