//! ActivityRecord / VoiceSession entity <-> model mapper

use xp_core::entities::{ActivityRecord, VoiceSession};
use xp_core::value_objects::Snowflake;

use crate::models::{ActivityRecordModel, VoiceSessionModel};

/// Read a non-negative counter column; negative values read as 0
pub fn count_from_db(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Counters past `i64::MAX` are stored saturated
pub fn count_to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl From<ActivityRecordModel> for ActivityRecord {
    fn from(model: ActivityRecordModel) -> Self {
        ActivityRecord {
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            total_xp: count_from_db(model.total_xp),
            weekly_xp: count_from_db(model.weekly_xp),
            level: u32::try_from(model.level).unwrap_or(1).max(1),
            last_message_award_at: model.last_message_award_at,
            last_voice_award_at: model.last_voice_award_at,
            voice_minutes: count_from_db(model.voice_minutes),
            message_count: count_from_db(model.message_count),
        }
    }
}

impl From<VoiceSessionModel> for VoiceSession {
    fn from(model: VoiceSessionModel) -> Self {
        VoiceSession {
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            channel_id: Snowflake::new(model.channel_id),
            joined_at: model.joined_at,
            last_tick_at: model.last_tick_at,
        }
    }
}
