//! Session lifecycle: countdown resets, completion scans, and statistics.

use std::sync::Arc;

use checkpoint_core::Clock;
use checkpoint_core::analytics::{self, StatisticsReport};
use checkpoint_core::model::{ScanEvent, SessionId, SessionStatus};
use storage::repository::{
    ScanEventRepository, SessionStatsRepository, Storage, StorageError,
};

use crate::error::CheckpointError;
use crate::registry::SessionRegistry;

//
// ─── SCAN OUTCOME ──────────────────────────────────────────────────────────────
//

/// How durably a scan was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDurability {
    /// Counted and written to the event log.
    Recorded,
    /// Counted, but no countdown was running so no elapsed time exists.
    Untimed,
    /// Counted in memory; the durable write failed and was logged.
    Degraded,
}

/// Result of registering one completion scan. A scan always lands in the
/// live counter, so this carries the new count rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    pub completion_count: u32,
    pub durability: ScanDurability,
}

//
// ─── CHECKPOINT SERVICE ────────────────────────────────────────────────────────
//

/// Orchestrates countdown resets, scan registration, and statistics over the
/// live registry and the durable repositories.
pub struct CheckpointService {
    clock: Clock,
    registry: Arc<SessionRegistry>,
    sessions: Arc<dyn SessionStatsRepository>,
    events: Arc<dyn ScanEventRepository>,
}

impl CheckpointService {
    #[must_use]
    pub fn new(storage: &Storage, registry: Arc<SessionRegistry>, clock: Clock) -> Self {
        Self {
            clock,
            registry,
            sessions: Arc::clone(&storage.sessions),
            events: Arc::clone(&storage.events),
        }
    }

    /// Start (or restart) the countdown for a session.
    ///
    /// Zeroes the live counter, stamps the timer start, wipes the event log,
    /// and upserts the durable stats row. The per-session lock is held across
    /// the durable writes so a racing scan observes either the old session or
    /// the fully reset one.
    ///
    /// # Errors
    ///
    /// `CheckpointError::InvalidDuration` for a zero duration (nothing
    /// changes), or a storage error if the durable reset fails.
    pub async fn reset(
        &self,
        session_id: &SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
    ) -> Result<(), CheckpointError> {
        if countdown_duration_seconds == 0 {
            return Err(CheckpointError::InvalidDuration);
        }

        let now = self.clock.now();
        let slot = self.registry.slot(session_id, now);
        let mut entry = slot.lock().await;
        entry.completion_count = 0;
        entry.timer_started_at = Some(now);
        entry.last_activity = now;

        if let Err(err) = self
            .persist_reset(session_id, countdown_duration_seconds, starting_team_count, now)
            .await
        {
            // No stats row exists for this round; leave no running timer so
            // later scans are counted as untimed instead of logging events
            // against it.
            entry.timer_started_at = None;
            return Err(err.into());
        }

        tracing::info!(
            session = %session_id,
            duration_seconds = countdown_duration_seconds,
            teams = starting_team_count,
            "countdown reset"
        );
        Ok(())
    }

    /// Register one completion scan.
    ///
    /// The increment is never lost: the live count goes up even when no
    /// countdown is running or the durable write fails. The outcome says
    /// which of those happened.
    pub async fn record_scan(&self, session_id: &SessionId) -> ScanOutcome {
        let now = self.clock.now();
        let slot = self.registry.slot(session_id, now);
        let mut entry = slot.lock().await;
        entry.completion_count += 1;
        entry.last_activity = now;
        let count = entry.completion_count;

        let Some(started_at) = entry.timer_started_at else {
            tracing::debug!(session = %session_id, count, "scan without an active countdown");
            return ScanOutcome {
                completion_count: count,
                durability: ScanDurability::Untimed,
            };
        };

        let elapsed = u32::try_from((now - started_at).num_seconds().max(0)).unwrap_or(u32::MAX);
        let event = ScanEvent::new(session_id.clone(), elapsed, now);
        match self.persist_scan(&event, count).await {
            Ok(()) => ScanOutcome {
                completion_count: count,
                durability: ScanDurability::Recorded,
            },
            Err(err) => {
                tracing::warn!(
                    session = %session_id,
                    error = %err,
                    "scan counted but durable write failed"
                );
                ScanOutcome {
                    completion_count: count,
                    durability: ScanDurability::Degraded,
                }
            }
        }
    }

    async fn persist_reset(
        &self,
        session_id: &SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), StorageError> {
        self.events.clear_events(session_id).await?;
        self.sessions
            .start_session(session_id, countdown_duration_seconds, starting_team_count, now)
            .await?;
        Ok(())
    }

    async fn persist_scan(&self, event: &ScanEvent, count: u32) -> Result<(), StorageError> {
        self.events.append_event(event).await?;
        self.sessions
            .update_finishing_count(&event.session_id, count)
            .await
    }

    /// Current live completion count, 0 for an unknown session id.
    pub async fn current_count(&self, session_id: &SessionId) -> u32 {
        self.registry.current_count(session_id).await
    }

    /// Compute the statistics report for a session from its durable row and
    /// event log, and refresh the cached analytics on the row.
    ///
    /// # Errors
    ///
    /// `CheckpointError::SessionNotFound` if the id was never reset, or a
    /// storage error from the reads.
    pub async fn statistics(
        &self,
        session_id: &SessionId,
    ) -> Result<StatisticsReport, CheckpointError> {
        let stats = self.sessions.get_session(session_id).await.map_err(|err| {
            match err {
                StorageError::NotFound => CheckpointError::SessionNotFound(session_id.clone()),
                other => CheckpointError::Storage(other),
            }
        })?;
        let events = self.events.list_events(session_id).await?;
        let report = analytics::compute(&stats, &events);

        // Cache refresh is best effort; the report is already in hand.
        if let Err(err) = self
            .sessions
            .store_analytics(session_id, report.derived.as_ref())
            .await
        {
            tracing::warn!(session = %session_id, error = %err, "analytics cache write failed");
        }

        Ok(report)
    }

    /// Update the lifecycle status on the durable row.
    ///
    /// # Errors
    ///
    /// `CheckpointError::SessionNotFound` if the id was never reset.
    pub async fn set_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), CheckpointError> {
        self.sessions
            .set_status(session_id, status)
            .await
            .map_err(|err| match err {
                StorageError::NotFound => CheckpointError::SessionNotFound(session_id.clone()),
                other => CheckpointError::Storage(other),
            })
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
