//! WeeklyArchive entity <-> model mapper

use xp_core::entities::{ArchiveEntry, WeeklyArchive};
use xp_core::error::DomainError;
use xp_core::value_objects::Snowflake;

use crate::models::WeeklyArchiveModel;

/// Serialize archive entries for the JSONB column
pub fn entries_to_json(entries: &[ArchiveEntry]) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(entries).map_err(|e| DomainError::SerializationError(e.to_string()))
}

impl TryFrom<WeeklyArchiveModel> for WeeklyArchive {
    type Error = DomainError;

    fn try_from(model: WeeklyArchiveModel) -> Result<Self, Self::Error> {
        let entries: Vec<ArchiveEntry> = serde_json::from_value(model.entries)
            .map_err(|e| DomainError::SerializationError(format!("archive {}: {e}", model.id)))?;

        Ok(WeeklyArchive {
            id: model.id,
            guild_id: Snowflake::new(model.guild_id),
            week_start: model.week_start,
            week_end: model.week_end,
            entries,
            created_at: model.created_at,
        })
    }
}
