//! # xp-worker
//!
//! Process host for the leveling engine. `Runtime` owns the service context,
//! the guild cache and the voice sweeper; a platform adapter embeds it and
//! feeds events through `Runtime::listener`.

pub mod runtime;

pub use runtime::Runtime;
