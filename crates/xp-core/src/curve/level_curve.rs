//! Evaluated level curve
//!
//! Two shapes are supported:
//!
//! - **Exponential**: `xp_for(L) = floor(base_xp * multiplier^(L-1))` for `L > 1`.
//! - **Table**: per-level thresholds built from sparse anchors by integer
//!   interpolation, extrapolated with the slope of the last segment.
//!
//! Both satisfy `xp_for(level_for(xp)) <= xp`, and `level_for` never decreases
//! as `xp` grows. Construction never fails: a malformed config falls back to a
//! built-in curve, and [`LevelCurve::try_new`] reports why.

use super::config::{default_base_xp, default_multiplier, CurveAnchor, LevelCurveConfig};
use crate::error::DomainError;

/// Levels materialized in the anchor table; higher levels reuse the last slope
pub const MAX_TABLE_LEVEL: u32 = 100;

/// Anchors above this level are ignored (keeps the table bounded)
pub const MAX_ANCHOR_LEVEL: u32 = 10_000;

/// Table used when an anchor config has nothing usable in it
const FALLBACK_THRESHOLDS: [u64; 5] = [0, 100, 300, 700, 1_500];

#[derive(Debug, Clone, PartialEq)]
enum Shape {
    Exponential { base_xp: u64, multiplier: f64 },
    Table { thresholds: Vec<u64>, slope: u64 },
}

/// XP ↔ level mapping
#[derive(Debug, Clone, PartialEq)]
pub struct LevelCurve {
    shape: Shape,
}

impl LevelCurve {
    /// Build a curve, falling back to the built-in default of the same type
    /// when the config is malformed
    pub fn new(config: &LevelCurveConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|_| Self::fallback_for(config))
    }

    /// Build a curve, rejecting malformed configs
    pub fn try_new(config: &LevelCurveConfig) -> Result<Self, DomainError> {
        match config {
            LevelCurveConfig::Exponential {
                base_xp,
                multiplier,
            } => {
                if *base_xp == 0 {
                    return Err(DomainError::InvalidCurve("base_xp must be positive".into()));
                }
                if !multiplier.is_finite() || *multiplier <= 1.0 {
                    return Err(DomainError::InvalidCurve(format!(
                        "multiplier must be a finite number above 1, got {multiplier}"
                    )));
                }
                Ok(Self {
                    shape: Shape::Exponential {
                        base_xp: *base_xp,
                        multiplier: *multiplier,
                    },
                })
            }
            LevelCurveConfig::Anchors { anchors, .. } => {
                let (thresholds, slope) = build_table(anchors).ok_or_else(|| {
                    DomainError::InvalidCurve("no anchors with level > 1".into())
                })?;
                Ok(Self {
                    shape: Shape::Table { thresholds, slope },
                })
            }
        }
    }

    /// The curve substituted for a malformed config
    pub fn fallback_for(config: &LevelCurveConfig) -> Self {
        match config {
            LevelCurveConfig::Exponential { .. } => Self {
                shape: Shape::Exponential {
                    base_xp: default_base_xp(),
                    multiplier: default_multiplier(),
                },
            },
            LevelCurveConfig::Anchors { .. } => {
                let thresholds = FALLBACK_THRESHOLDS.to_vec();
                let slope = thresholds[thresholds.len() - 1] - thresholds[thresholds.len() - 2];
                Self {
                    shape: Shape::Table { thresholds, slope },
                }
            }
        }
    }

    /// Level reached with `xp` total experience (always ≥ 1)
    pub fn level_for(&self, xp: u64) -> u32 {
        match &self.shape {
            Shape::Exponential {
                base_xp,
                multiplier,
            } => exponential_level(*base_xp, *multiplier, xp),
            Shape::Table { thresholds, slope } => {
                // thresholds[0] == 0, so at least one entry qualifies
                let reached = thresholds.partition_point(|&t| t <= xp);
                if reached < thresholds.len() || *slope == 0 {
                    return reached as u32;
                }
                let last = thresholds[reached - 1];
                let extra = (xp - last) / slope;
                (reached as u64).saturating_add(extra).min(u64::from(u32::MAX)) as u32
            }
        }
    }

    /// Total experience required to reach `level` (0 for levels ≤ 1)
    pub fn xp_for(&self, level: u32) -> u64 {
        if level <= 1 {
            return 0;
        }
        match &self.shape {
            Shape::Exponential {
                base_xp,
                multiplier,
            } => exponential_xp(*base_xp, *multiplier, level),
            Shape::Table { thresholds, slope } => {
                let idx = (level - 1) as usize;
                if let Some(&t) = thresholds.get(idx) {
                    return t;
                }
                let last_level = thresholds.len() as u64;
                let last = thresholds[thresholds.len() - 1];
                last.saturating_add(slope.saturating_mul(u64::from(level) - last_level))
            }
        }
    }

    /// XP per level past the end of the anchor table (`None` for exponential curves)
    pub fn tail_slope(&self) -> Option<u64> {
        match &self.shape {
            Shape::Table { slope, .. } => Some(*slope),
            Shape::Exponential { .. } => None,
        }
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::new(&LevelCurveConfig::default())
    }
}

#[allow(clippy::cast_precision_loss)]
fn exponential_xp(base_xp: u64, multiplier: f64, level: u32) -> u64 {
    let value = base_xp as f64 * multiplier.powf(f64::from(level - 1));
    // float -> int casts saturate, so huge levels pin at u64::MAX
    value.floor() as u64
}

#[allow(clippy::cast_precision_loss)]
fn exponential_level(base_xp: u64, multiplier: f64, xp: u64) -> u32 {
    if xp < base_xp {
        return 1;
    }

    let estimate = 1.0 + ((xp as f64 / base_xp as f64).ln() / multiplier.ln()).floor();
    let candidate = estimate.clamp(1.0, f64::from(u32::MAX)) as u32;

    let holds = |level: u32| {
        exponential_xp(base_xp, multiplier, level) <= xp
            && (level == u32::MAX || xp < exponential_xp(base_xp, multiplier, level + 1))
    };
    if holds(candidate) {
        return candidate;
    }

    // Rounding put the closed form one step off; settle it exactly.
    let (mut lo, mut hi) = (1u32, u32::MAX);
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        if exponential_xp(base_xp, multiplier, mid) <= xp {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}

fn build_table(anchors: &[CurveAnchor]) -> Option<(Vec<u64>, u64)> {
    let mut points: Vec<CurveAnchor> = anchors
        .iter()
        .copied()
        .filter(|a| a.level > 1 && a.level <= MAX_ANCHOR_LEVEL)
        .collect();
    if points.is_empty() {
        return None;
    }
    points.sort_by_key(|a| a.level);
    points.dedup_by_key(|a| a.level);

    let mut thresholds = Vec::with_capacity(MAX_TABLE_LEVEL as usize);
    thresholds.push(0u64);

    let (mut prev_level, mut prev_xp) = (1u32, 0u64);
    let mut slope = 0u64;

    for anchor in &points {
        let span = u64::from(anchor.level - prev_level);
        for step in 1..=span {
            let value = interpolate(prev_xp, anchor.xp, step, span);
            let floor = thresholds[thresholds.len() - 1];
            thresholds.push(value.max(floor));
        }
        slope = segment_slope(prev_xp, anchor.xp, span);
        prev_level = anchor.level;
        prev_xp = anchor.xp;
    }

    while thresholds.len() < MAX_TABLE_LEVEL as usize {
        let last = thresholds[thresholds.len() - 1];
        thresholds.push(last.saturating_add(slope));
    }

    Some((thresholds, slope))
}

/// `floor(from + step/span * (to - from))`, exact in integers
fn interpolate(from: u64, to: u64, step: u64, span: u64) -> u64 {
    let delta = i128::from(to) - i128::from(from);
    let value = i128::from(from) + (i128::from(step) * delta).div_euclid(i128::from(span));
    u64::try_from(value.max(0)).unwrap_or(u64::MAX)
}

fn segment_slope(from: u64, to: u64, span: u64) -> u64 {
    let delta = i128::from(to) - i128::from(from);
    u64::try_from(delta.div_euclid(i128::from(span)).max(0)).unwrap_or(u64::MAX)
}
