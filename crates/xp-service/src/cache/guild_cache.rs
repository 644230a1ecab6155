//! Guild cache
//!
//! Members, channels and voice presence per guild, using DashMap for
//! thread-safe access.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use xp_core::traits::GuildDirectory;
use xp_core::{Member, Snowflake};

type MemberKey = (Snowflake, Snowflake);

/// Guild state as last reported by the platform
#[derive(Debug, Default)]
pub struct GuildCache {
    /// Members by (guild, user)
    members: DashMap<MemberKey, Member>,

    /// Channel ids per guild
    channels: DashMap<Snowflake, HashSet<Snowflake>>,

    /// Connected voice channel by (guild, user)
    voice: DashMap<MemberKey, Snowflake>,
}

impl GuildCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // =========================================================================
    // Channels
    // =========================================================================

    pub fn add_channel(&self, guild_id: Snowflake, channel_id: Snowflake) {
        self.channels.entry(guild_id).or_default().insert(channel_id);
    }

    /// Forget a channel and every voice connection pointing at it
    pub fn remove_channel(&self, guild_id: Snowflake, channel_id: Snowflake) -> bool {
        let removed = self
            .channels
            .get_mut(&guild_id)
            .is_some_and(|mut channels| channels.remove(&channel_id));

        self.voice
            .retain(|(g, _), c| !(*g == guild_id && *c == channel_id));

        removed
    }

    /// Replace the known channel list of a guild
    pub fn replace_channels(&self, guild_id: Snowflake, channels: impl IntoIterator<Item = Snowflake>) {
        self.channels.insert(guild_id, channels.into_iter().collect());
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub fn upsert_member(&self, member: Member) {
        self.members.insert((member.guild_id, member.user_id), member);
    }

    /// Forget a member and their voice connection
    pub fn remove_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.voice.remove(&(guild_id, user_id));
        self.members.remove(&(guild_id, user_id)).map(|(_, m)| m)
    }

    pub fn get_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.members.get(&(guild_id, user_id)).map(|r| r.clone())
    }

    pub fn member_count(&self, guild_id: Snowflake) -> usize {
        self.members.iter().filter(|r| r.key().0 == guild_id).count()
    }

    // =========================================================================
    // Voice presence
    // =========================================================================

    /// Record the member's voice channel; `None` means disconnected
    pub fn set_voice_channel(&self, guild_id: Snowflake, user_id: Snowflake, channel_id: Option<Snowflake>) {
        match channel_id {
            Some(channel_id) => {
                self.voice.insert((guild_id, user_id), channel_id);
            }
            None => {
                self.voice.remove(&(guild_id, user_id));
            }
        }
    }

    pub fn current_voice_channel(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Snowflake> {
        self.voice.get(&(guild_id, user_id)).map(|r| *r)
    }
}

#[async_trait]
impl GuildDirectory for GuildCache {
    async fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.get_member(guild_id, user_id)
    }

    async fn channel_exists(&self, guild_id: Snowflake, channel_id: Snowflake) -> bool {
        self.channels
            .get(&guild_id)
            .is_some_and(|channels| channels.contains(&channel_id))
    }

    async fn voice_channel_of(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Snowflake> {
        self.current_voice_channel(guild_id, user_id)
    }
}
