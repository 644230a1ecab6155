//! Configuration
//!
//! - [`AppConfig`]: process settings from the environment (database, sweep cadence)
//! - [`LevelingSettings`]: the operator-editable leveling rules, loaded from a JSON
//!   file and mutated at runtime through [`SettingsStore`]

mod app_config;
mod settings;
mod store;

pub use app_config::{AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, WorkerConfig};
pub use settings::{LevelingSettings, MessageXpSettings, SettingsError, VoiceXpSettings};
pub use store::SettingsStore;
