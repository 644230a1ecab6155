//! Leveling settings
//!
//! The rules an operator tunes per guild: XP ranges, cooldowns, channel
//! whitelists, exempt roles, reward tiers and the level curve. Stored as JSON:
//!
//! ```json
//! {
//!   "guild_id": "1180000000000000000",
//!   "message": { "xp_min": 25, "xp_max": 25, "cooldown_seconds": 15, "whitelisted_channels": [] },
//!   "voice": { "xp_min": 25, "xp_max": 25, "tick_interval_seconds": 60, "whitelisted_channels": [] },
//!   "level_curve": { "type": "anchors", "anchors": [{ "level": 5, "xp": 7500 }] },
//!   "role_rewards": { "5": "1180000000000000001" },
//!   "exempt_roles": []
//! }
//! ```
//!
//! Any field may be overridden with `XP__SECTION__FIELD` environment variables.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};
use xp_core::{DomainError, LevelCurve, LevelCurveConfig, Member, RewardTierMap, Snowflake};

/// Message XP rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_message_range"))]
pub struct MessageXpSettings {
    pub xp_min: u64,
    pub xp_max: u64,
    #[validate(range(min = 1, message = "Message cooldown must be at least 1 second"))]
    pub cooldown_seconds: u64,
    pub whitelisted_channels: BTreeSet<Snowflake>,
}

impl Default for MessageXpSettings {
    fn default() -> Self {
        Self {
            xp_min: 25,
            xp_max: 25,
            cooldown_seconds: 15,
            whitelisted_channels: BTreeSet::new(),
        }
    }
}

/// Voice XP rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_voice_range"))]
pub struct VoiceXpSettings {
    pub xp_min: u64,
    pub xp_max: u64,
    #[validate(range(min = 10, message = "Voice tick interval must be at least 10 seconds"))]
    pub tick_interval_seconds: u64,
    pub whitelisted_channels: BTreeSet<Snowflake>,
}

impl Default for VoiceXpSettings {
    fn default() -> Self {
        Self {
            xp_min: 25,
            xp_max: 25,
            tick_interval_seconds: 60,
            whitelisted_channels: BTreeSet::new(),
        }
    }
}

/// Operator-editable leveling rules for one guild
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LevelingSettings {
    /// Guild the engine serves; events from other guilds are ignored
    pub guild_id: Snowflake,
    #[validate(nested)]
    pub message: MessageXpSettings,
    #[validate(nested)]
    pub voice: VoiceXpSettings,
    pub level_curve: LevelCurveConfig,
    pub role_rewards: RewardTierMap,
    pub exempt_roles: BTreeSet<Snowflake>,
}

impl LevelingSettings {
    /// Load from a JSON file (missing file = defaults) plus `XP__*` env overrides
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let built = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix("XP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| SettingsError::Load(e.to_string()))?;

        let settings: Self = built
            .try_deserialize()
            .map_err(|e| SettingsError::Load(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse from a JSON string (no env overrides)
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Pretty JSON for writing back to disk
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_message_channel(&self, channel_id: Snowflake) -> bool {
        self.message.whitelisted_channels.contains(&channel_id)
    }

    pub fn is_voice_channel(&self, channel_id: Snowflake) -> bool {
        self.voice.whitelisted_channels.contains(&channel_id)
    }

    /// Bots and holders of an exempt role never earn XP
    pub fn is_exempt(&self, member: &Member) -> bool {
        member.bot || member.role_ids.iter().any(|r| self.exempt_roles.contains(r))
    }

    /// Whether `guild_id` is the guild this engine serves
    pub fn serves(&self, guild_id: Snowflake) -> bool {
        !self.guild_id.is_zero() && self.guild_id == guild_id
    }

    /// Evaluate the configured level curve (falls back when malformed)
    pub fn curve(&self) -> LevelCurve {
        LevelCurve::new(&self.level_curve)
    }

    /// Problems worth a warning at startup; none of them stop the engine
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.guild_id.is_zero() {
            issues.push("guild_id is not set; every event will be ignored".to_string());
        }
        if self.message.whitelisted_channels.is_empty() {
            issues.push("no message channels are whitelisted; message XP is off".to_string());
        }
        if self.voice.whitelisted_channels.is_empty() {
            issues.push("no voice channels are whitelisted; voice XP is off".to_string());
        }
        if self.role_rewards.is_empty() {
            issues.push("no role rewards are configured".to_string());
        }
        if let Err(e) = LevelCurve::try_new(&self.level_curve) {
            issues.push(format!("{e}; the built-in curve is used instead"));
        }
        for role in self.role_rewards.role_set() {
            if self.exempt_roles.contains(&role) {
                issues.push(format!("role {role} is both a reward and exempt from XP"));
            }
        }

        issues
    }
}

fn validate_message_range(settings: &MessageXpSettings) -> Result<(), ValidationError> {
    check_range(settings.xp_min, settings.xp_max)
}

fn validate_voice_range(settings: &VoiceXpSettings) -> Result<(), ValidationError> {
    check_range(settings.xp_min, settings.xp_max)
}

fn check_range(min: u64, max: u64) -> Result<(), ValidationError> {
    if min > max {
        let mut err = ValidationError::new("xp_range");
        err.message = Some(format!("Minimum XP ({min}) cannot exceed maximum XP ({max})").into());
        return Err(err);
    }
    Ok(())
}

/// Settings load/update errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(String),

    #[error("Invalid settings: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
