//! Level curve - the XP ↔ level staircase
//!
//! A [`LevelCurveConfig`] is what operators write in the settings file; a
//! [`LevelCurve`] is the evaluated form used on every award.

mod config;
mod level_curve;

pub use config::{CurveAnchor, LevelCurveConfig};
pub use level_curve::{LevelCurve, MAX_ANCHOR_LEVEL, MAX_TABLE_LEVEL};
