//! Reward tiers - level thresholds that unlock a reward role

use std::collections::{BTreeMap, HashSet};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Level threshold → reward role
///
/// Serialized as a JSON object keyed by level (`{"5": "1234", "10": "5678"}`).
/// The roles are mutually exclusive: a member should hold only the role of the
/// highest threshold their level reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "BTreeMap<String, Snowflake>")]
pub struct RewardTierMap(BTreeMap<u32, Snowflake>);

impl RewardTierMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reward for a threshold, returning the role it replaced
    pub fn insert(
        &mut self,
        level: u32,
        role_id: Snowflake,
    ) -> Result<Option<Snowflake>, DomainError> {
        if level == 0 {
            return Err(DomainError::InvalidLevel(level));
        }
        Ok(self.0.insert(level, role_id))
    }

    /// Drop the reward for a threshold
    pub fn remove(&mut self, level: u32) -> Option<Snowflake> {
        self.0.remove(&level)
    }

    /// Role of the highest threshold ≤ `level`
    pub fn role_for_level(&self, level: u32) -> Option<Snowflake> {
        if level == 0 {
            return None;
        }
        self.0.range(1..=level).next_back().map(|(_, &role)| role)
    }

    /// Every reward role in the map
    pub fn role_set(&self) -> HashSet<Snowflake> {
        self.0.values().copied().collect()
    }

    pub fn contains_role(&self, role_id: Snowflake) -> bool {
        self.0.values().any(|&r| r == role_id)
    }

    pub fn get(&self, level: u32) -> Option<Snowflake> {
        self.0.get(&level).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Thresholds in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u32, Snowflake)> + '_ {
        self.0.iter().map(|(&level, &role)| (level, role))
    }
}

// Map keys arrive as strings from both JSON and env-var sources
impl TryFrom<BTreeMap<String, Snowflake>> for RewardTierMap {
    type Error = DomainError;

    fn try_from(raw: BTreeMap<String, Snowflake>) -> Result<Self, Self::Error> {
        let mut map = Self::new();
        for (key, role_id) in raw {
            let level = key.trim().parse::<u32>().map_err(|_| {
                DomainError::ValidationError(format!("reward level {key:?} is not a number"))
            })?;
            map.insert(level, role_id)?;
        }
        Ok(map)
    }
}

impl Serialize for RewardTierMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (level, role_id) in &self.0 {
            map.serialize_entry(&level.to_string(), role_id)?;
        }
        map.end()
    }
}

impl FromIterator<(u32, Snowflake)> for RewardTierMap {
    fn from_iter<I: IntoIterator<Item = (u32, Snowflake)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|(level, _)| *level > 0).collect())
    }
}
