//! Voice session tracking
//!
//! `VoiceTracker` turns voice state updates into session changes and runs one
//! sweep over the active sessions. `VoiceSweeper` drives the sweep on a fixed
//! interval in the background.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

use xp_common::LevelingSettings;
use xp_core::{Snowflake, VoiceSession};

use crate::dto::{SweepReport, VoiceTransition};

use super::context::ServiceContext;
use super::engine::{AwardDecision, SkipReason, XpEngine};
use super::error::{ServiceError, ServiceResult};

/// What the sweep did with one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionOutcome {
    Awarded,
    Ended,
    Skipped,
}

/// Voice session tracker
pub struct VoiceTracker<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> VoiceTracker<'a> {
    /// Create a new VoiceTracker
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Apply a voice state change
    ///
    /// `before` and `after` are the member's voice channel before and after
    /// the update; `None` means disconnected.
    #[instrument(skip(self))]
    pub async fn on_voice_state_update(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        before: Option<Snowflake>,
        after: Option<Snowflake>,
        now: i64,
    ) -> ServiceResult<VoiceTransition> {
        let settings = self.ctx.settings().snapshot();
        if !settings.serves(guild_id) {
            return Ok(VoiceTransition::Ignored);
        }

        let store = self.ctx.store();

        let transition = match (before, after) {
            (None, None) => VoiceTransition::Ignored,
            // Mute, deafen, stream toggles
            (Some(from), Some(to)) if from == to => VoiceTransition::Ignored,
            (_, None) => self.end(guild_id, user_id).await?,
            (_, Some(to)) if !settings.is_voice_channel(to) => self.end(guild_id, user_id).await?,
            (None, Some(to)) => {
                store.start_session(guild_id, user_id, to, now).await?;
                VoiceTransition::Started
            }
            (Some(_), Some(to)) => {
                if store.move_session(guild_id, user_id, to).await? {
                    VoiceTransition::Moved
                } else {
                    store.start_session(guild_id, user_id, to, now).await?;
                    VoiceTransition::Started
                }
            }
        };

        if transition != VoiceTransition::Ignored {
            tracing::debug!(
                guild_id = %guild_id,
                user_id = %user_id,
                transition = ?transition,
                "Voice session updated"
            );
        }

        Ok(transition)
    }

    async fn end(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<VoiceTransition> {
        if self.ctx.store().end_session(guild_id, user_id).await? {
            Ok(VoiceTransition::Ended)
        } else {
            Ok(VoiceTransition::Ignored)
        }
    }

    /// One pass over every active session of the configured guild
    ///
    /// Only listing the sessions can fail the sweep; each session is handled
    /// on its own and failures are counted in the report.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self, now: i64) -> ServiceResult<SweepReport> {
        let settings = self.ctx.settings().snapshot();
        let guild_id = settings.guild_id;
        let mut report = SweepReport::default();

        if guild_id.is_zero() {
            return Ok(report);
        }

        let sessions = self.ctx.store().active_sessions(guild_id).await?;

        for session in &sessions {
            report.examined += 1;
            match self.sweep_session(&settings, session, now).await {
                Ok(SessionOutcome::Awarded) => report.awarded += 1,
                Ok(SessionOutcome::Ended) => report.ended_stale += 1,
                Ok(SessionOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        error = %e,
                        guild_id = %session.guild_id,
                        user_id = %session.user_id,
                        "Voice sweep failed for session"
                    );
                }
            }
        }

        if report.examined > 0 {
            tracing::debug!(
                examined = report.examined,
                awarded = report.awarded,
                ended = report.ended_stale,
                failed = report.failed,
                "Voice sweep finished"
            );
        }

        Ok(report)
    }

    async fn sweep_session(
        &self,
        settings: &LevelingSettings,
        session: &VoiceSession,
        now: i64,
    ) -> ServiceResult<SessionOutcome> {
        let (guild_id, user_id, channel_id) = (session.guild_id, session.user_id, session.channel_id);
        let directory = self.ctx.directory();

        let member = directory.member(guild_id, user_id).await;
        let still_connected = match &member {
            Some(_) => {
                directory.channel_exists(guild_id, channel_id).await
                    && directory.voice_channel_of(guild_id, user_id).await == Some(channel_id)
                    && settings.is_voice_channel(channel_id)
            }
            None => false,
        };

        let Some(member) = member.filter(|_| still_connected) else {
            self.ctx.store().end_session(guild_id, user_id).await?;
            tracing::debug!(guild_id = %guild_id, user_id = %user_id, "Ended stale voice session");
            return Ok(SessionOutcome::Ended);
        };

        if !session.tick_due(now, settings.voice.tick_interval_seconds) {
            return Ok(SessionOutcome::Skipped);
        }

        match XpEngine::new(self.ctx).award_voice(&member, channel_id, now).await {
            AwardDecision::Awarded(_) => {
                self.ctx
                    .store()
                    .increment_voice_minutes(guild_id, user_id, session.accrued_minutes(now))
                    .await?;
                Ok(SessionOutcome::Awarded)
            }
            AwardDecision::Skipped(SkipReason::PersistenceFailed) => {
                Err(ServiceError::internal("voice award could not be stored"))
            }
            AwardDecision::Skipped(_) => Ok(SessionOutcome::Skipped),
        }
    }
}

// ============================================================================
// Background sweeper
// ============================================================================

/// Periodic voice sweep
pub struct VoiceSweeper {
    ctx: ServiceContext,
    interval: Duration,
    /// Whether the sweep loop is running
    running: Arc<AtomicBool>,
}

impl VoiceSweeper {
    pub fn new(ctx: ServiceContext, interval: Duration) -> Self {
        Self {
            ctx,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the sweep loop
    ///
    /// The loop waits until `ready` reads `true`, then sweeps every
    /// `interval` until `shutdown` reads `true` (or its sender is dropped).
    /// A sweep in progress always runs to completion.
    pub fn start(self: Arc<Self>, ready: watch::Receiver<bool>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("Voice sweeper is already running");
            return tokio::spawn(async {});
        }

        tokio::spawn(async move {
            self.run(ready, shutdown).await;
        })
    }

    /// Ask the loop to stop after the current sweep
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, mut ready: watch::Receiver<bool>, mut shutdown: watch::Receiver<bool>) {
        tokio::select! {
            res = ready.wait_for(|r| *r) => {
                if res.is_err() {
                    tracing::warn!("Readiness signal dropped before the sweeper started");
                    self.running.store(false, Ordering::SeqCst);
                    return;
                }
            }
            _ = shutdown.wait_for(|s| *s) => {
                self.running.store(false, Ordering::SeqCst);
                return;
            }
        }

        tracing::info!(interval_secs = self.interval.as_secs(), "Voice sweeper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.wait_for(|s| *s) => break,
            }

            let now = Utc::now().timestamp();
            if let Err(e) = VoiceTracker::new(&self.ctx).sweep_once(now).await {
                tracing::error!(error = %e, "Voice sweep failed");
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Voice sweeper stopped");
    }
}
