//! Domain entities - core business objects

mod activity;
mod archive;
mod member;
mod tiers;
mod voice_session;

pub use activity::{ActivityRecord, LeaderboardEntry, LeaderboardOrder};
pub use archive::{ActivitySnapshot, ArchiveEntry, WeeklyArchive};
pub use member::Member;
pub use tiers::RewardTierMap;
pub use voice_session::VoiceSession;
