//! # xp-common
//!
//! Shared utilities: process configuration, the operator-editable leveling
//! settings, application errors, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    AppConfig, AppSettings, ConfigError, DatabaseConfig, Environment, LevelingSettings,
    MessageXpSettings, SettingsError, SettingsStore, VoiceXpSettings, WorkerConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{
    init_tracing, try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError,
};
