//! In-process view of guild state
//!
//! Fed by platform events through the activity listener and read by the
//! voice sweep through the `GuildDirectory` trait.

mod guild_cache;

pub use guild_cache::GuildCache;
