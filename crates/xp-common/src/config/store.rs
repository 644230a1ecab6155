//! Shared, hot-swappable leveling settings
//!
//! Readers take a cheap snapshot (`Arc` clones) per event. Every mutation
//! builds a new settings value, validates it, writes it to disk when the store
//! is file-backed, and only then swaps it in, so readers never see a
//! half-applied change.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use validator::Validate;
use xp_core::{LevelCurve, LevelCurveConfig, Snowflake};

use super::settings::{LevelingSettings, SettingsError};

#[derive(Debug)]
struct Inner {
    settings: Arc<LevelingSettings>,
    curve: Arc<LevelCurve>,
}

impl Inner {
    fn new(settings: LevelingSettings) -> Self {
        let curve = settings.curve();
        Self {
            settings: Arc::new(settings),
            curve: Arc::new(curve),
        }
    }
}

/// Leveling settings plus the curve derived from them
#[derive(Debug)]
pub struct SettingsStore {
    inner: RwLock<Inner>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// In-memory store; changes are not persisted
    pub fn new(settings: LevelingSettings) -> Self {
        Self {
            inner: RwLock::new(Inner::new(settings)),
            path: None,
        }
    }

    /// Load settings from `path` and write every later change back to it
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let settings = LevelingSettings::load(&path)?;

        if let Err(e) = LevelCurve::try_new(&settings.level_curve) {
            tracing::warn!(error = %e, "Malformed level curve, using built-in fallback");
        }
        for issue in settings.issues() {
            tracing::warn!(path = %path.display(), "Leveling settings: {issue}");
        }

        Ok(Self {
            inner: RwLock::new(Inner::new(settings)),
            path: Some(path),
        })
    }

    /// Current settings
    pub fn snapshot(&self) -> Arc<LevelingSettings> {
        Arc::clone(&self.inner.read().settings)
    }

    /// Curve for the current settings
    pub fn curve(&self) -> Arc<LevelCurve> {
        Arc::clone(&self.inner.read().curve)
    }

    /// Settings and curve taken under one lock, so they always agree
    pub fn current(&self) -> (Arc<LevelingSettings>, Arc<LevelCurve>) {
        let inner = self.inner.read();
        (Arc::clone(&inner.settings), Arc::clone(&inner.curve))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the current settings to disk (no-op for in-memory stores)
    pub fn save(&self) -> Result<(), SettingsError> {
        let settings = self.snapshot();
        self.persist(&settings)
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    pub fn set_guild(&self, guild_id: Snowflake) -> Result<(), SettingsError> {
        self.update(|s| {
            s.guild_id = guild_id;
            Ok(())
        })
    }

    pub fn set_message_cooldown(&self, seconds: u64) -> Result<(), SettingsError> {
        self.update(|s| {
            s.message.cooldown_seconds = seconds;
            Ok(())
        })
    }

    pub fn set_message_xp_range(&self, min: u64, max: u64) -> Result<(), SettingsError> {
        self.update(|s| {
            s.message.xp_min = min;
            s.message.xp_max = max;
            Ok(())
        })
    }

    pub fn set_voice_xp_range(&self, min: u64, max: u64) -> Result<(), SettingsError> {
        self.update(|s| {
            s.voice.xp_min = min;
            s.voice.xp_max = max;
            Ok(())
        })
    }

    pub fn set_voice_tick_interval(&self, seconds: u64) -> Result<(), SettingsError> {
        self.update(|s| {
            s.voice.tick_interval_seconds = seconds;
            Ok(())
        })
    }

    /// Returns false if the channel was already whitelisted
    pub fn add_message_channel(&self, channel_id: Snowflake) -> Result<bool, SettingsError> {
        self.update(|s| Ok(s.message.whitelisted_channels.insert(channel_id)))
    }

    pub fn remove_message_channel(&self, channel_id: Snowflake) -> Result<bool, SettingsError> {
        self.update(|s| Ok(s.message.whitelisted_channels.remove(&channel_id)))
    }

    pub fn add_voice_channel(&self, channel_id: Snowflake) -> Result<bool, SettingsError> {
        self.update(|s| Ok(s.voice.whitelisted_channels.insert(channel_id)))
    }

    pub fn remove_voice_channel(&self, channel_id: Snowflake) -> Result<bool, SettingsError> {
        self.update(|s| Ok(s.voice.whitelisted_channels.remove(&channel_id)))
    }

    /// Map a level threshold to a reward role, returning the role it replaced
    pub fn set_role_reward(
        &self,
        level: u32,
        role_id: Snowflake,
    ) -> Result<Option<Snowflake>, SettingsError> {
        self.update(|s| Ok(s.role_rewards.insert(level, role_id)?))
    }

    pub fn remove_role_reward(&self, level: u32) -> Result<Option<Snowflake>, SettingsError> {
        self.update(|s| Ok(s.role_rewards.remove(level)))
    }

    pub fn add_exempt_role(&self, role_id: Snowflake) -> Result<bool, SettingsError> {
        self.update(|s| Ok(s.exempt_roles.insert(role_id)))
    }

    pub fn remove_exempt_role(&self, role_id: Snowflake) -> Result<bool, SettingsError> {
        self.update(|s| Ok(s.exempt_roles.remove(&role_id)))
    }

    /// Replace the level curve; malformed curves are rejected here rather
    /// than silently falling back
    pub fn set_level_curve(&self, config: LevelCurveConfig) -> Result<(), SettingsError> {
        LevelCurve::try_new(&config)?;
        self.update(|s| {
            s.level_curve = config;
            Ok(())
        })
    }

    fn update<T>(
        &self,
        mutate: impl FnOnce(&mut LevelingSettings) -> Result<T, SettingsError>,
    ) -> Result<T, SettingsError> {
        let mut inner = self.inner.write();

        let mut next = (*inner.settings).clone();
        let out = mutate(&mut next)?;
        next.validate()?;
        self.persist(&next)?;

        *inner = Inner::new(next);
        Ok(out)
    }

    fn persist(&self, settings: &LevelingSettings) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        std::fs::write(path, settings.to_json()?)?;
        tracing::debug!(path = %path.display(), "Leveling settings saved");
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(LevelingSettings::default())
    }
}
