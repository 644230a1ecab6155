//! Leveling Integration Tests
//!
//! End-to-end scenarios over the in-memory store. The PostgreSQL variants
//! at the bottom require DATABASE_URL and skip otherwise.
//!
//! Run with: cargo test -p integration-tests --test leveling_tests

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use integration_tests::{
    tiered_settings, unique_user, RoleCall, TestWorld, GUILD, T0, TEXT_CHANNEL, TIER_A, TIER_B,
    VOICE_CHANNEL,
};
use serde_json::json;
use xp_core::{AuditKind, LeaderboardOrder, Snowflake};
use xp_service::{AdminService, StatsService, VoiceTracker, XpEngine};
use xp_worker::Runtime;

// ============================================================================
// Awards
// ============================================================================

#[tokio::test]
async fn test_message_cooldown_scenario() {
    let world = TestWorld::new();
    let member = world.member(unique_user());

    let first = world.listener.on_message(&member, TEXT_CHANNEL, T0).await.unwrap();
    assert_eq!(first.xp_awarded, 25);
    assert!(world.listener.on_message(&member, TEXT_CHANNEL, T0 + 10).await.is_none());
    let third = world.listener.on_message(&member, TEXT_CHANNEL, T0 + 16).await.unwrap();
    assert_eq!(third.total_xp, 50);

    let record = world.record(member.user_id).await.unwrap();
    assert_eq!(record.total_xp, 50);
    assert_eq!(record.weekly_xp, 50);
    assert_eq!(record.message_count, 2);
}

#[tokio::test]
async fn test_replayed_event_inside_window_awards_once() {
    let world = TestWorld::new();
    let member = world.member(unique_user());

    let awarded = [
        world.listener.on_message(&member, TEXT_CHANNEL, T0).await,
        world.listener.on_message(&member, TEXT_CHANNEL, T0).await,
        world.listener.on_message(&member, TEXT_CHANNEL, T0 + 14).await,
    ]
    .iter()
    .filter(|o| o.is_some())
    .count();

    assert_eq!(awarded, 1);
    assert_eq!(world.record(member.user_id).await.unwrap().total_xp, 25);
}

#[tokio::test]
async fn test_concurrent_awards_for_many_members() {
    let world = TestWorld::new();
    let users: Vec<Snowflake> = (0..20).map(|_| unique_user()).collect();

    let mut handles = Vec::new();
    for user_id in &users {
        let ctx = world.ctx.clone();
        let member = world.member(*user_id);
        handles.push(tokio::spawn(async move {
            XpEngine::new(&ctx).award_message_xp(&member, TEXT_CHANNEL, T0).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    for user_id in users {
        assert_eq!(world.record(user_id).await.unwrap().total_xp, 25);
    }
}

#[tokio::test]
async fn test_concurrent_awards_for_one_member_stay_consistent() {
    let world = TestWorld::new();
    let member = world.member(unique_user());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let ctx = world.ctx.clone();
        let member = member.clone();
        handles.push(tokio::spawn(async move {
            XpEngine::new(&ctx).award_message_xp(&member, TEXT_CHANNEL, T0).await
        }));
    }

    let mut awarded = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            awarded += 1;
        }
    }

    // The check-then-write race may let more than one through; every award
    // that happened is fully counted
    assert!(awarded >= 1);
    let record = world.record(member.user_id).await.unwrap();
    assert_eq!(record.total_xp, 25 * awarded);
    assert_eq!(record.message_count, awarded);
}

// ============================================================================
// Tier roles
// ============================================================================

#[tokio::test]
async fn test_tier_progression_scenario() {
    let world = TestWorld::new();
    let curve = world.settings.curve();
    let admin = AdminService::new(&world.ctx);
    let member = world.member(unique_user());
    let user_id = member.user_id;

    // Just short of level 7, then one message over the line
    admin.set_xp(GUILD, user_id, curve.xp_for(7) - 10, None).await.unwrap();
    let outcome = world.listener.on_message(&member, TEXT_CHANNEL, T0).await.unwrap();
    assert_eq!((outcome.old_level, outcome.new_level), (6, 7));
    assert_eq!(world.gateway.roles_of(user_id), HashSet::from([TIER_A]));

    admin.set_xp(GUILD, user_id, curve.xp_for(12) - 10, None).await.unwrap();
    let outcome = world.listener.on_message(&member, TEXT_CHANNEL, T0 + 20).await.unwrap();
    assert_eq!(outcome.new_level, 12);
    assert_eq!(world.gateway.roles_of(user_id), HashSet::from([TIER_B]));

    admin.set_level(GUILD, user_id, 8).await.unwrap();
    let report = admin.sync(GUILD, user_id).await.unwrap();
    assert_eq!(report.removed, vec![TIER_B]);
    assert_eq!(report.granted, vec![TIER_A]);
    assert_eq!(world.gateway.roles_of(user_id), HashSet::from([TIER_A]));

    assert_eq!(
        world.gateway.calls(),
        vec![
            RoleCall::Add(user_id, TIER_A),
            RoleCall::Remove(user_id, TIER_A),
            RoleCall::Add(user_id, TIER_B),
            RoleCall::Remove(user_id, TIER_B),
            RoleCall::Add(user_id, TIER_A),
        ]
    );

    let kinds = world.audit.kinds_for(user_id);
    assert_eq!(kinds.iter().filter(|k| **k == AuditKind::LevelUp).count(), 2);
    assert_eq!(kinds.iter().filter(|k| **k == AuditKind::RewardUnlocked).count(), 2);
}

#[tokio::test]
async fn test_exactly_one_tier_after_sync() {
    let world = TestWorld::new();
    let admin = AdminService::new(&world.ctx);
    let tiers: HashSet<Snowflake> = HashSet::from([TIER_A, TIER_B]);

    for level in [1, 4, 5, 9, 10, 25] {
        let user_id = unique_user();
        world.gateway.give(user_id, TIER_A);
        world.gateway.give(user_id, TIER_B);
        admin.set_level(GUILD, user_id, level).await.unwrap();

        admin.sync(GUILD, user_id).await.unwrap();

        let held: HashSet<Snowflake> = world.gateway.roles_of(user_id).intersection(&tiers).copied().collect();
        let expected = match level {
            0..=4 => HashSet::new(),
            5..=9 => HashSet::from([TIER_A]),
            _ => HashSet::from([TIER_B]),
        };
        assert_eq!(held, expected, "level {level}");
    }
}

#[tokio::test]
async fn test_refused_grant_is_repaired_by_sync() {
    let world = TestWorld::new();
    let curve = world.settings.curve();
    let admin = AdminService::new(&world.ctx);
    let member = world.member(unique_user());

    world.gateway.forbid(TIER_A);
    admin.set_xp(GUILD, member.user_id, curve.xp_for(5) - 1, None).await.unwrap();

    // The award itself still succeeds
    let outcome = world.listener.on_message(&member, TEXT_CHANNEL, T0).await.unwrap();
    assert!(outcome.leveled_up);
    assert!(world.gateway.roles_of(member.user_id).is_empty());

    world.gateway.heal();
    let report = admin.sync(GUILD, member.user_id).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(world.gateway.roles_of(member.user_id), HashSet::from([TIER_A]));
}

#[tokio::test]
async fn test_transient_removal_failure_is_reported() {
    let world = TestWorld::new();
    let admin = AdminService::new(&world.ctx);
    let user_id = unique_user();

    world.gateway.give(user_id, TIER_A);
    world.gateway.fail(TIER_A);
    admin.set_level(GUILD, user_id, 10).await.unwrap();

    let report = admin.sync(GUILD, user_id).await.unwrap();
    assert_eq!(report.granted, vec![TIER_B]);
    assert_eq!(report.failures.len(), 1);
    assert!(!report.failures[0].forbidden);
}

// ============================================================================
// Voice
// ============================================================================

#[tokio::test]
async fn test_voice_session_lifecycle() {
    let world = TestWorld::new();
    let member = world.member(unique_user());
    let tracker = VoiceTracker::new(&world.ctx);

    world.join_voice(&member, T0).await;

    let report = tracker.sweep_once(T0 + 90).await.unwrap();
    assert_eq!(report.awarded, 1);
    let report = tracker.sweep_once(T0 + 150).await.unwrap();
    assert_eq!(report.awarded, 1);

    let record = world.record(member.user_id).await.unwrap();
    assert_eq!(record.total_xp, 50);
    assert_eq!(record.voice_minutes, 2);
    assert_eq!(record.message_count, 0);

    world
        .listener
        .on_voice_state_update(&member, Some(VOICE_CHANNEL), None, T0 + 200)
        .await;
    let report = tracker.sweep_once(T0 + 300).await.unwrap();
    assert_eq!(report.examined, 0);
}

#[tokio::test]
async fn test_sweep_isolates_stale_sessions() {
    let world = TestWorld::new();
    let tracker = VoiceTracker::new(&world.ctx);
    let stays = world.member(unique_user());
    let leaves = world.member(unique_user());

    world.join_voice(&stays, T0).await;
    world.join_voice(&leaves, T0).await;
    world.cache.remove_member(GUILD, leaves.user_id);

    let report = tracker.sweep_once(T0 + 60).await.unwrap();
    assert_eq!(report.examined, 2);
    assert_eq!(report.awarded, 1);
    assert_eq!(report.ended_stale, 1);
    assert!(world.record(leaves.user_id).await.is_none());
}

#[tokio::test]
async fn test_deleted_voice_channel_ends_sessions() {
    let world = TestWorld::new();
    let tracker = VoiceTracker::new(&world.ctx);
    let member = world.member(unique_user());

    world.join_voice(&member, T0).await;
    world.listener.on_channel_delete(GUILD, VOICE_CHANNEL);

    let report = tracker.sweep_once(T0 + 60).await.unwrap();
    assert_eq!(report.ended_stale, 1);
    assert!(world.record(member.user_id).await.is_none());
}

// ============================================================================
// Weekly rollover and stats
// ============================================================================

#[tokio::test]
async fn test_weekly_rollover_scenario() {
    let world = TestWorld::new();
    let admin = AdminService::new(&world.ctx);
    let stats = StatsService::new(&world.ctx);
    let (a, b) = (world.member(unique_user()), world.member(unique_user()));

    world.listener.on_message(&a, TEXT_CHANNEL, T0).await.unwrap();
    world.listener.on_message(&a, TEXT_CHANNEL, T0 + 20).await.unwrap();
    world.listener.on_message(&b, TEXT_CHANNEL, T0).await.unwrap();

    let weekly = stats.leaderboard(GUILD, 10, LeaderboardOrder::WeeklyXp).await.unwrap();
    assert_eq!(weekly[0].user_id, a.user_id);
    assert_eq!(weekly[0].weekly_xp, 50);

    let archive = admin.rollover_weekly(GUILD, Utc::now()).await.unwrap();
    assert_eq!(archive.entries.len(), 2);
    assert_eq!(archive.total_xp(), 75);

    let record = world.record(a.user_id).await.unwrap();
    assert_eq!(record.total_xp, 50);
    assert_eq!(record.weekly_xp, 0);
    assert_eq!(record.message_count, 0);
    assert_eq!(record.last_message_award_at, T0 + 20);

    assert!(stats
        .leaderboard(GUILD, 10, LeaderboardOrder::WeeklyXp)
        .await
        .unwrap()
        .is_empty());
    let card = stats.user_stats(GUILD, a.user_id).await.unwrap();
    assert_eq!(card.permanent_rank, Some(1));
    // everyone is back at zero, so everyone shares first place
    assert_eq!(card.weekly_rank, Some(1));

    assert_eq!(stats.weekly_archives(GUILD, 10).await.unwrap().len(), 1);

    let rollover = world
        .audit
        .entries()
        .into_iter()
        .find(|e| e.kind == AuditKind::WeeklyRollover)
        .unwrap();
    assert_eq!(
        rollover.detail,
        json!({ "archive_id": archive.id, "members": 2, "total_xp": 75 })
    );
}

// ============================================================================
// Worker runtime
// ============================================================================

#[tokio::test]
async fn test_runtime_leaves_sessions_alone_until_ready() {
    let world = TestWorld::new();
    let absent = unique_user();
    let now = Utc::now().timestamp();
    world.store.start_session(GUILD, absent, VOICE_CHANNEL, now - 120).await.unwrap();

    let runtime = Runtime::new(world.ctx.clone(), world.cache.clone(), Duration::from_millis(10));
    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await
        .unwrap();

    let sessions = world.store.active_sessions(GUILD).await.unwrap();
    assert!(sessions.iter().any(|s| s.user_id == absent));
}

#[tokio::test]
async fn test_runtime_sweeps_once_marked_ready() {
    let world = TestWorld::new();
    let absent = unique_user();
    let member = world.member(unique_user());
    let now = Utc::now().timestamp();
    world.join_voice(&member, now - 120).await;
    world.store.start_session(GUILD, absent, VOICE_CHANNEL, now - 120).await.unwrap();

    let runtime = Runtime::new(world.ctx.clone(), world.cache.clone(), Duration::from_millis(10));
    runtime.mark_ready();
    runtime
        .run_until(tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap();

    assert_eq!(world.record(member.user_id).await.unwrap().total_xp, 25);
    // Unknown to the populated cache, so the sweep closes it
    let sessions = world.store.active_sessions(GUILD).await.unwrap();
    assert!(sessions.iter().all(|s| s.user_id != absent));
}

// ============================================================================
// PostgreSQL
// ============================================================================

#[tokio::test]
async fn test_award_and_level_up_on_postgres() {
    let Some(world) = TestWorld::postgres(tiered_settings()).await else {
        return;
    };
    let guild = world.guild;
    let curve = world.settings.curve();
    let admin = AdminService::new(&world.ctx);
    let member = world.member(unique_user());

    admin.set_xp(guild, member.user_id, curve.xp_for(5) - 5, None).await.unwrap();
    let outcome = world.listener.on_message(&member, TEXT_CHANNEL, T0).await.unwrap();
    assert!(outcome.leveled_up);
    assert_eq!(outcome.new_level, 5);

    let record = world.record(member.user_id).await.unwrap();
    assert_eq!(record.level, 5);
    assert_eq!(world.gateway.roles_of(member.user_id), HashSet::from([TIER_A]));

    let card = StatsService::new(&world.ctx).user_stats(guild, member.user_id).await.unwrap();
    assert_eq!(card.permanent_rank, Some(1));
}

#[tokio::test]
async fn test_voice_sweep_on_postgres() {
    let Some(world) = TestWorld::postgres(tiered_settings()).await else {
        return;
    };
    let member = world.member(unique_user());
    world.join_voice(&member, T0).await;

    let report = VoiceTracker::new(&world.ctx).sweep_once(T0 + 120).await.unwrap();
    assert_eq!(report.awarded, 1);

    let record = world.record(member.user_id).await.unwrap();
    assert_eq!(record.total_xp, 25);
    assert_eq!(record.voice_minutes, 2);
}
