//! XP award engine
//!
//! Decides whether a message or a voice tick earns XP, applies the award,
//! keeps the cached level in step with the curve, and hands level-ups to the
//! role reconciler.

use rand::Rng;
use serde::Serialize;
use tracing::instrument;

use xp_common::LevelingSettings;
use xp_core::events::AuditEntry;
use xp_core::{ActivityRecord, Member, Snowflake};

use super::context::ServiceContext;
use super::reconciler::RoleReconciler;

/// Why an award did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Bot, exempt role, foreign guild, or channel not whitelisted
    NotEligible,
    /// Too soon after the previous award of the same kind
    CooldownActive,
    /// The store failed or lost the record
    PersistenceFailed,
}

/// A completed award
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AwardOutcome {
    pub xp_awarded: u64,
    pub old_level: u32,
    pub new_level: u32,
    pub total_xp: u64,
    pub weekly_xp: u64,
    pub leveled_up: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardDecision {
    Awarded(AwardOutcome),
    Skipped(SkipReason),
}

impl AwardDecision {
    pub fn outcome(self) -> Option<AwardOutcome> {
        match self {
            Self::Awarded(outcome) => Some(outcome),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reason(self) -> Option<SkipReason> {
        match self {
            Self::Awarded(_) => None,
            Self::Skipped(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Message,
    Voice,
}

impl Source {
    fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Voice => "voice",
        }
    }

    fn channel_allowed(self, settings: &LevelingSettings, channel_id: Snowflake) -> bool {
        match self {
            Self::Message => settings.is_message_channel(channel_id),
            Self::Voice => settings.is_voice_channel(channel_id),
        }
    }

    fn window_elapsed(self, settings: &LevelingSettings, record: &ActivityRecord, now: i64) -> bool {
        match self {
            Self::Message => record.message_cooldown_elapsed(now, settings.message.cooldown_seconds),
            Self::Voice => record.voice_interval_elapsed(now, settings.voice.tick_interval_seconds),
        }
    }

    fn xp_range(self, settings: &LevelingSettings) -> (u64, u64) {
        match self {
            Self::Message => (settings.message.xp_min, settings.message.xp_max),
            Self::Voice => (settings.voice.xp_min, settings.voice.xp_max),
        }
    }
}

/// Uniform roll in `min..=max`
fn roll_xp(min: u64, max: u64) -> u64 {
    if min >= max {
        return max;
    }
    rand::thread_rng().gen_range(min..=max)
}

/// XP award engine
pub struct XpEngine<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> XpEngine<'a> {
    /// Create a new XpEngine
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Try to award message XP for a message in `channel_id` at `now`
    #[instrument(skip(self, member), fields(guild_id = %member.guild_id, user_id = %member.user_id))]
    pub async fn award_message(&self, member: &Member, channel_id: Snowflake, now: i64) -> AwardDecision {
        self.award(Source::Message, member, channel_id, now).await
    }

    /// `award_message` with every skip collapsed to `None`
    pub async fn award_message_xp(&self, member: &Member, channel_id: Snowflake, now: i64) -> Option<AwardOutcome> {
        self.award_message(member, channel_id, now).await.outcome()
    }

    /// Try to award voice XP for time spent in `channel_id` up to `now`
    #[instrument(skip(self, member), fields(guild_id = %member.guild_id, user_id = %member.user_id))]
    pub async fn award_voice(&self, member: &Member, channel_id: Snowflake, now: i64) -> AwardDecision {
        self.award(Source::Voice, member, channel_id, now).await
    }

    /// `award_voice` with every skip collapsed to `None`
    pub async fn award_voice_xp(&self, member: &Member, channel_id: Snowflake, now: i64) -> Option<AwardOutcome> {
        self.award_voice(member, channel_id, now).await.outcome()
    }

    async fn award(&self, source: Source, member: &Member, channel_id: Snowflake, now: i64) -> AwardDecision {
        let (settings, curve) = self.ctx.settings().current();
        let (guild_id, user_id) = (member.guild_id, member.user_id);

        if !settings.serves(guild_id)
            || settings.is_exempt(member)
            || !source.channel_allowed(&settings, channel_id)
        {
            return AwardDecision::Skipped(SkipReason::NotEligible);
        }

        let store = self.ctx.store();

        let record = match store.get_or_create(guild_id, user_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(error = %e, source = source.as_str(), "Failed to load activity record");
                return AwardDecision::Skipped(SkipReason::PersistenceFailed);
            }
        };

        if !source.window_elapsed(&settings, &record, now) {
            return AwardDecision::Skipped(SkipReason::CooldownActive);
        }

        let (min, max) = source.xp_range(&settings);
        let xp = roll_xp(min, max);

        let applied = match source {
            Source::Message => store.apply_message_award(guild_id, user_id, xp, now).await,
            Source::Voice => store.apply_voice_award(guild_id, user_id, xp, now).await,
        };
        match applied {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(source = source.as_str(), "Activity record vanished before award");
                return AwardDecision::Skipped(SkipReason::PersistenceFailed);
            }
            Err(e) => {
                tracing::error!(error = %e, source = source.as_str(), "Failed to apply award");
                return AwardDecision::Skipped(SkipReason::PersistenceFailed);
            }
        }

        // Re-read so concurrent awards are reflected in the level
        let estimated = (
            record.total_xp.saturating_add(xp),
            record.weekly_xp.saturating_add(xp),
            record.level,
        );
        let (total_xp, weekly_xp, stored_level) = match store.get(guild_id, user_id).await {
            Ok(Some(after)) => (after.total_xp, after.weekly_xp, after.level),
            Ok(None) => {
                tracing::warn!(source = source.as_str(), "Activity record vanished after award");
                estimated
            }
            Err(e) => {
                tracing::warn!(error = %e, source = source.as_str(), "Failed to re-read activity record");
                estimated
            }
        };

        let old_level = record.level;
        let new_level = curve.level_for(total_xp);
        if new_level != stored_level {
            if let Err(e) = store.set_level(guild_id, user_id, new_level).await {
                tracing::warn!(error = %e, level = new_level, "Failed to persist level");
            }
        }

        let follow_up = match source {
            Source::Message => store.increment_message_count(guild_id, user_id, 1).await,
            Source::Voice => store.touch_session_tick(guild_id, user_id, now).await,
        };
        if let Err(e) = follow_up {
            tracing::warn!(error = %e, source = source.as_str(), "Failed to update activity counters");
        }

        let leveled_up = new_level > old_level;
        if leveled_up {
            tracing::info!(
                guild_id = %guild_id,
                user_id = %user_id,
                old_level,
                new_level,
                total_xp,
                "Member leveled up"
            );
            self.ctx
                .audit()
                .record(AuditEntry::level_up(guild_id, user_id, old_level, new_level, total_xp))
                .await;
            RoleReconciler::new(self.ctx)
                .reconcile(guild_id, user_id, old_level, new_level)
                .await;
        }

        tracing::debug!(source = source.as_str(), xp, total_xp, "XP awarded");

        AwardDecision::Awarded(AwardOutcome {
            xp_awarded: xp,
            old_level,
            new_level,
            total_xp,
            weekly_xp,
            leveled_up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{faulty_harness, harness, AwardFault, GUILD, TEXT, TIER_A, VOICE};
    use xp_core::{ActivityStore, AuditKind};

    const T0: i64 = 1_700_000_000;

    fn member(id: i64) -> Member {
        Member::new(GUILD, Snowflake::new(id))
    }

    #[test]
    fn test_roll_xp_stays_in_range() {
        assert_eq!(roll_xp(25, 25), 25);
        for _ in 0..100 {
            let xp = roll_xp(10, 20);
            assert!((10..=20).contains(&xp));
        }
    }

    #[tokio::test]
    async fn test_message_cooldown() {
        let h = harness();
        let engine = XpEngine::new(&h.ctx);
        let m = member(1);

        let first = engine.award_message_xp(&m, TEXT, T0).await.unwrap();
        assert_eq!(first.xp_awarded, 25);
        assert_eq!(first.total_xp, 25);

        assert_eq!(
            engine.award_message(&m, TEXT, T0 + 10).await,
            AwardDecision::Skipped(SkipReason::CooldownActive)
        );

        let third = engine.award_message_xp(&m, TEXT, T0 + 16).await.unwrap();
        assert_eq!(third.total_xp, 50);

        let record = h.store.get(GUILD, m.user_id).await.unwrap().unwrap();
        assert_eq!(record.message_count, 2);
        assert_eq!(record.last_message_award_at, T0 + 16);
    }

    #[tokio::test]
    async fn test_ineligible_messages_are_skipped() {
        let h = harness();
        let engine = XpEngine::new(&h.ctx);
        h.settings.add_exempt_role(Snowflake::new(77)).unwrap();

        let not_eligible = AwardDecision::Skipped(SkipReason::NotEligible);
        assert_eq!(engine.award_message(&Member::bot(GUILD, Snowflake::new(1)), TEXT, 0).await, not_eligible);
        assert_eq!(
            engine
                .award_message(&member(2).with_roles([Snowflake::new(77)]), TEXT, 0)
                .await,
            not_eligible
        );
        assert_eq!(engine.award_message(&member(3), Snowflake::new(999), 0).await, not_eligible);
        assert_eq!(
            engine
                .award_message(&Member::new(Snowflake::new(1), Snowflake::new(4)), TEXT, 0)
                .await,
            not_eligible
        );
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_message_and_voice_cooldowns_are_independent() {
        let h = harness();
        let engine = XpEngine::new(&h.ctx);
        let m = member(1);

        assert!(engine.award_message_xp(&m, TEXT, T0).await.is_some());
        assert!(engine.award_voice_xp(&m, VOICE, T0).await.is_some());
        assert!(engine.award_voice_xp(&m, VOICE, T0 + 30).await.is_none());
        assert!(engine.award_voice_xp(&m, VOICE, T0 + 60).await.is_some());

        let record = h.store.get(GUILD, m.user_id).await.unwrap().unwrap();
        assert_eq!(record.total_xp, 75);
        // voice awards do not count as messages
        assert_eq!(record.message_count, 1);
    }

    #[tokio::test]
    async fn test_level_up_persists_level_and_grants_tier() {
        let h = harness();
        let engine = XpEngine::new(&h.ctx);
        let m = member(1);

        h.store.get_or_create(GUILD, m.user_id).await.unwrap();
        h.store.set_xp(GUILD, m.user_id, 7_490, None).await.unwrap();
        h.store.set_level(GUILD, m.user_id, 4).await.unwrap();

        let outcome = engine.award_message_xp(&m, TEXT, T0).await.unwrap();
        assert!(outcome.leveled_up);
        assert_eq!(outcome.old_level, 4);
        assert_eq!(outcome.new_level, 5);

        let record = h.store.get(GUILD, m.user_id).await.unwrap().unwrap();
        assert_eq!(record.level, 5);
        assert!(h.gateway.roles_of(m.user_id).contains(&TIER_A));

        let kinds = h.audit.kinds();
        assert_eq!(kinds[0], AuditKind::LevelUp);
        assert!(kinds.contains(&AuditKind::RoleGranted));
        assert!(kinds.contains(&AuditKind::RewardUnlocked));
    }

    #[tokio::test]
    async fn test_award_without_level_change_touches_nothing_else() {
        let h = harness();
        let engine = XpEngine::new(&h.ctx);

        let outcome = engine.award_message_xp(&member(1), TEXT, T0).await.unwrap();
        assert!(!outcome.leveled_up);
        assert_eq!(outcome.new_level, 1);
        assert!(h.audit.kinds().is_empty());
        assert!(h.gateway.roles_of(Snowflake::new(1)).is_empty());
    }

    #[tokio::test]
    async fn test_failed_award_write_is_reported_and_leaves_record() {
        let (h, store) = faulty_harness();
        let engine = XpEngine::new(&h.ctx);
        store.fail_awards(Snowflake::new(1), AwardFault::Error);
        store.fail_awards(Snowflake::new(2), AwardFault::Missing);

        for id in [1, 2] {
            let m = member(id);
            assert_eq!(
                engine.award_message(&m, TEXT, T0).await,
                AwardDecision::Skipped(SkipReason::PersistenceFailed)
            );
            assert_eq!(
                engine.award_voice(&m, VOICE, T0).await,
                AwardDecision::Skipped(SkipReason::PersistenceFailed)
            );

            let record = h.store.get(GUILD, m.user_id).await.unwrap().unwrap();
            assert_eq!(record.total_xp, 0);
            assert_eq!(record.weekly_xp, 0);
            assert_eq!(record.message_count, 0);
            assert_eq!(record.last_message_award_at, 0);
            assert_eq!(record.last_voice_award_at, 0);
        }

        // Other members are unaffected
        assert!(engine.award_message_xp(&member(3), TEXT, T0).await.is_some());
        assert!(h.audit.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_failed_reread_falls_back_to_estimate() {
        let (h, store) = faulty_harness();
        let engine = XpEngine::new(&h.ctx);
        let m = member(1);
        h.store.get_or_create(GUILD, m.user_id).await.unwrap();
        h.store.set_xp(GUILD, m.user_id, 7_490, None).await.unwrap();
        h.store.set_level(GUILD, m.user_id, 4).await.unwrap();
        store.fail_reads(m.user_id);

        let outcome = engine.award_message_xp(&m, TEXT, T0).await.unwrap();
        assert_eq!(outcome.total_xp, 7_515);
        assert_eq!(outcome.new_level, 5);
        assert!(outcome.leveled_up);

        let record = h.store.get(GUILD, m.user_id).await.unwrap().unwrap();
        assert_eq!(record.total_xp, 7_515);
        assert_eq!(record.level, 5);
    }
}
