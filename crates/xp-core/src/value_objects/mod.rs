//! Value objects - immutable identifiers shared by every layer

mod snowflake;

pub use snowflake::{Snowflake, SnowflakeParseError};
