use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use checkpoint_core::model::SessionId;

//
// ─── SESSION ENTRY ─────────────────────────────────────────────────────────────
//

/// Live, in-memory state for one session.
///
/// Ephemeral: lost on restart and rebuilt from the durable stats row's
/// finishing count, never from event replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub completion_count: u32,
    pub last_activity: DateTime<Utc>,
    pub timer_started_at: Option<DateTime<Utc>>,
}

impl SessionEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            completion_count: 0,
            last_activity: now,
            timer_started_at: None,
        }
    }
}

//
// ─── SESSION REGISTRY ──────────────────────────────────────────────────────────
//

/// Concurrency-safe table of live session counters and timers.
///
/// Each session id owns its own slot behind an async mutex, so reset and
/// scan for the same id serialize while unrelated sessions never contend.
/// The outer map lock is held only long enough to fetch or insert a slot and
/// never across an `.await`.
///
/// Constructed once at process start and injected into the services that
/// need it; there is no ambient singleton.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<SessionEntry>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot for a session id, created lazily with a zero entry.
    ///
    /// Only mutating paths (reset, scan, rehydrate) call this; pure reads go
    /// through `current_count` and never create entries.
    pub fn slot(&self, session_id: &SessionId, now: DateTime<Utc>) -> Arc<Mutex<SessionEntry>> {
        if let Some(slot) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
        {
            return Arc::clone(slot);
        }

        let mut guard = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            guard
                .entry(session_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(SessionEntry::new(now)))),
        )
    }

    /// Current completion count, 0 for unknown session ids.
    ///
    /// Unknown ids stay unknown: reads never mutate the table.
    pub async fn current_count(&self, session_id: &SessionId) -> u32 {
        let slot = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned();

        match slot {
            Some(slot) => slot.lock().await.completion_count,
            None => 0,
        }
    }

    /// Seed an entry with a persisted completion count and no active timer.
    /// Used at startup to reconcile with the durable finishing-count mirror.
    pub async fn rehydrate(&self, session_id: &SessionId, count: u32, now: DateTime<Utc>) {
        let slot = self.slot(session_id, now);
        let mut entry = slot.lock().await;
        entry.completion_count = count;
        entry.timer_started_at = None;
        entry.last_activity = now;
    }

    /// Number of known sessions. Entries are never evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
