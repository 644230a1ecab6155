//! Platform event entry points
//!
//! A platform adapter forwards gateway events here. The listener keeps the
//! guild cache current and hands activity to the engine and voice tracker.

use std::sync::Arc;

use xp_core::{Member, Snowflake};

use crate::cache::GuildCache;
use crate::dto::{ReconcileReport, VoiceTransition};

use super::context::ServiceContext;
use super::engine::{AwardOutcome, XpEngine};
use super::reconciler::RoleReconciler;
use super::voice::VoiceTracker;

/// Event listener owned by the platform adapter
#[derive(Clone)]
pub struct ActivityListener {
    ctx: ServiceContext,
    cache: Arc<GuildCache>,
}

impl ActivityListener {
    pub fn new(ctx: ServiceContext, cache: Arc<GuildCache>) -> Self {
        Self { ctx, cache }
    }

    pub fn context(&self) -> &ServiceContext {
        &self.ctx
    }

    pub fn cache(&self) -> &GuildCache {
        &self.cache
    }

    /// Guild became available: replace its channels and members
    pub fn on_guild_available(
        &self,
        guild_id: Snowflake,
        channels: impl IntoIterator<Item = Snowflake>,
        members: impl IntoIterator<Item = Member>,
    ) {
        self.cache.replace_channels(guild_id, channels);
        for member in members {
            self.cache.upsert_member(member);
        }
        tracing::info!(
            guild_id = %guild_id,
            members = self.cache.member_count(guild_id),
            "Guild available"
        );
    }

    /// A message was sent; returns the award if one was made
    pub async fn on_message(&self, member: &Member, channel_id: Snowflake, now: i64) -> Option<AwardOutcome> {
        self.cache.upsert_member(member.clone());
        XpEngine::new(&self.ctx)
            .award_message_xp(member, channel_id, now)
            .await
    }

    /// Voice state changed; bots are tracked in the cache but never get sessions
    pub async fn on_voice_state_update(
        &self,
        member: &Member,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
        now: i64,
    ) -> VoiceTransition {
        let (guild_id, user_id) = (member.guild_id, member.user_id);
        self.cache.upsert_member(member.clone());
        self.cache.set_voice_channel(guild_id, user_id, after);

        if member.bot {
            return VoiceTransition::Ignored;
        }

        match VoiceTracker::new(&self.ctx)
            .on_voice_state_update(guild_id, user_id, before, after, now)
            .await
        {
            Ok(transition) => transition,
            Err(e) => {
                tracing::error!(error = %e, guild_id = %guild_id, user_id = %user_id, "Failed to update voice session");
                VoiceTransition::Ignored
            }
        }
    }

    /// Member roles changed on the platform
    pub fn on_member_update(&self, member: Member) {
        self.cache.upsert_member(member);
    }

    /// Member left the guild; their voice session goes with them
    pub async fn on_member_remove(&self, guild_id: Snowflake, user_id: Snowflake) {
        self.cache.remove_member(guild_id, user_id);
        if let Err(e) = self.ctx.store().end_session(guild_id, user_id).await {
            tracing::warn!(error = %e, guild_id = %guild_id, user_id = %user_id, "Failed to end voice session");
        }
    }

    pub fn on_channel_create(&self, guild_id: Snowflake, channel_id: Snowflake) {
        self.cache.add_channel(guild_id, channel_id);
    }

    /// Channel deleted; sessions in it are closed by the next sweep
    pub fn on_channel_delete(&self, guild_id: Snowflake, channel_id: Snowflake) {
        self.cache.remove_channel(guild_id, channel_id);
    }

    /// Repair a member's tier roles, e.g. after they rejoin
    pub async fn resync_member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<ReconcileReport> {
        match RoleReconciler::new(&self.ctx).sync(guild_id, user_id).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!(error = %e, guild_id = %guild_id, user_id = %user_id, "Role sync failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for ActivityListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityListener").finish_non_exhaustive()
    }
}
