//! Curve configuration as stored in the settings file

use serde::{Deserialize, Serialize};

/// A hand-authored control point: reaching `xp` grants `level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveAnchor {
    pub level: u32,
    pub xp: u64,
}

impl CurveAnchor {
    pub const fn new(level: u32, xp: u64) -> Self {
        Self { level, xp }
    }
}

/// Level curve configuration
///
/// ```json
/// { "type": "anchors", "anchors": [{ "level": 5, "xp": 7500 }], "base_xp": 100, "multiplier": 1.5 }
/// { "type": "exponential", "base_xp": 100, "multiplier": 1.5 }
/// ```
///
/// `base_xp`/`multiplier` are carried by the anchor variant too so an operator
/// can flip `type` without losing the exponential parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LevelCurveConfig {
    Exponential {
        #[serde(default = "default_base_xp")]
        base_xp: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
    #[serde(alias = "xp_anchors")]
    Anchors {
        #[serde(default)]
        anchors: Vec<CurveAnchor>,
        #[serde(default = "default_base_xp")]
        base_xp: u64,
        #[serde(default = "default_multiplier")]
        multiplier: f64,
    },
}

impl LevelCurveConfig {
    /// Curve shipped with a fresh settings file
    pub fn default_anchors() -> Vec<CurveAnchor> {
        vec![
            CurveAnchor::new(5, 7_500),
            CurveAnchor::new(10, 60_000),
            CurveAnchor::new(20, 120_000),
            CurveAnchor::new(30, 225_000),
            CurveAnchor::new(50, 375_000),
        ]
    }

    /// Exponential curve with the given parameters
    pub fn exponential(base_xp: u64, multiplier: f64) -> Self {
        Self::Exponential {
            base_xp,
            multiplier,
        }
    }

    /// Anchor curve with default exponential parameters attached
    pub fn anchors(anchors: Vec<CurveAnchor>) -> Self {
        Self::Anchors {
            anchors,
            base_xp: default_base_xp(),
            multiplier: default_multiplier(),
        }
    }

    /// Name of the curve type (for logs and summaries)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exponential { .. } => "exponential",
            Self::Anchors { .. } => "anchors",
        }
    }
}

impl Default for LevelCurveConfig {
    fn default() -> Self {
        Self::anchors(Self::default_anchors())
    }
}

pub(crate) fn default_base_xp() -> u64 {
    100
}

pub(crate) fn default_multiplier() -> f64 {
    1.5
}
