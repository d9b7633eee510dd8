use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checkpoint_core::model::{
    CachedAnalytics, ScanEvent, SessionConfig, SessionId, SessionStats, SessionStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the durable per-session stats row.
#[async_trait]
pub trait SessionStatsRepository: Send + Sync {
    /// Upsert the stats row for a freshly started countdown.
    ///
    /// A session id that has never been seen gets the next sequence number
    /// (monotonic across all sessions ever created); a known id keeps the
    /// sequence number it was originally assigned. Either way the row ends
    /// up active with a zero finishing count and cleared cached analytics.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn start_session(
        &self,
        session_id: &SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
        started_at: DateTime<Utc>,
    ) -> Result<SessionStats, StorageError>;

    /// Fetch the stats row for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session id has never been
    /// reset, or other storage errors.
    async fn get_session(&self, session_id: &SessionId) -> Result<SessionStats, StorageError>;

    /// All stats rows, ordered by sequence number. Used for startup
    /// rehydration of the in-memory registry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_sessions(&self) -> Result<Vec<SessionStats>, StorageError>;

    /// Mirror the live completion count onto the durable row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row exists for the id.
    async fn update_finishing_count(
        &self,
        session_id: &SessionId,
        count: u32,
    ) -> Result<(), StorageError>;

    /// Write (or clear, with `None`) the cached derived analytics.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row exists for the id.
    async fn store_analytics(
        &self,
        session_id: &SessionId,
        cached: Option<&CachedAnalytics>,
    ) -> Result<(), StorageError>;

    /// Update the lifecycle status of the session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row exists for the id.
    async fn set_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), StorageError>;
}

/// Repository contract for the append-only scan event log.
#[async_trait]
pub trait ScanEventRepository: Send + Sync {
    /// Append one completion event. Append-only; concurrent appends for the
    /// same session must not lose records.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn append_event(&self, event: &ScanEvent) -> Result<i64, StorageError>;

    /// All events for a session in arrival (storage) order. Sorting by
    /// elapsed time is the analytics engine's job.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn list_events(&self, session_id: &SessionId) -> Result<Vec<ScanEvent>, StorageError>;

    /// Delete all events for a session. Used by timer reset.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn clear_events(&self, session_id: &SessionId) -> Result<(), StorageError>;
}

/// Repository contract for the per-session configuration blob.
#[async_trait]
pub trait SessionStateRepository: Send + Sync {
    /// Fetch the stored configuration, `None` if never set.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failure.
    async fn get_state(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionConfig>, StorageError>;

    /// Store (upsert) the configuration for a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the configuration cannot be stored.
    async fn set_state(
        &self,
        session_id: &SessionId,
        config: &SessionConfig,
    ) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    stats: Arc<Mutex<HashMap<SessionId, SessionStats>>>,
    events: Arc<Mutex<HashMap<SessionId, Vec<ScanEvent>>>>,
    states: Arc<Mutex<HashMap<SessionId, SessionConfig>>>,
    next_sequence: Arc<AtomicI64>,
    next_event_id: Arc<AtomicI64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<T>(guard: &Arc<Mutex<T>>) -> Result<std::sync::MutexGuard<'_, T>, StorageError> {
        guard
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl SessionStatsRepository for InMemoryRepository {
    async fn start_session(
        &self,
        session_id: &SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
        started_at: DateTime<Utc>,
    ) -> Result<SessionStats, StorageError> {
        let mut guard = Self::lock(&self.stats)?;
        let sequence = match guard.get(session_id) {
            Some(existing) => existing.sequence_number(),
            None => self.next_sequence.fetch_add(1, Ordering::SeqCst) + 1,
        };
        let stats = SessionStats::start(
            session_id.clone(),
            countdown_duration_seconds,
            starting_team_count,
            sequence,
            started_at,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.insert(session_id.clone(), stats.clone());
        Ok(stats)
    }

    async fn get_session(&self, session_id: &SessionId) -> Result<SessionStats, StorageError> {
        let guard = Self::lock(&self.stats)?;
        guard.get(session_id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionStats>, StorageError> {
        let guard = Self::lock(&self.stats)?;
        let mut out: Vec<SessionStats> = guard.values().cloned().collect();
        out.sort_by_key(SessionStats::sequence_number);
        Ok(out)
    }

    async fn update_finishing_count(
        &self,
        session_id: &SessionId,
        count: u32,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.stats)?;
        let stats = guard.get_mut(session_id).ok_or(StorageError::NotFound)?;
        stats.set_finishing_team_count(count);
        Ok(())
    }

    async fn store_analytics(
        &self,
        session_id: &SessionId,
        cached: Option<&CachedAnalytics>,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.stats)?;
        let stats = guard.get_mut(session_id).ok_or(StorageError::NotFound)?;
        stats.set_cached(cached.cloned());
        Ok(())
    }

    async fn set_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.stats)?;
        let stats = guard.get_mut(session_id).ok_or(StorageError::NotFound)?;
        stats.set_status(status);
        Ok(())
    }
}

#[async_trait]
impl ScanEventRepository for InMemoryRepository {
    async fn append_event(&self, event: &ScanEvent) -> Result<i64, StorageError> {
        let mut guard = Self::lock(&self.events)?;
        guard
            .entry(event.session_id.clone())
            .or_default()
            .push(event.clone());
        Ok(self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn list_events(&self, session_id: &SessionId) -> Result<Vec<ScanEvent>, StorageError> {
        let guard = Self::lock(&self.events)?;
        Ok(guard.get(session_id).cloned().unwrap_or_default())
    }

    async fn clear_events(&self, session_id: &SessionId) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.events)?;
        guard.remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl SessionStateRepository for InMemoryRepository {
    async fn get_state(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionConfig>, StorageError> {
        let guard = Self::lock(&self.states)?;
        Ok(guard.get(session_id).cloned())
    }

    async fn set_state(
        &self,
        session_id: &SessionId,
        config: &SessionConfig,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.states)?;
        guard.insert(session_id.clone(), config.clone());
        Ok(())
    }
}

/// Aggregates the session repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionStatsRepository>,
    pub events: Arc<dyn ScanEventRepository>,
    pub states: Arc<dyn SessionStateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionStatsRepository> = Arc::new(repo.clone());
        let events: Arc<dyn ScanEventRepository> = Arc::new(repo.clone());
        let states: Arc<dyn SessionStateRepository> = Arc::new(repo);
        Self {
            sessions,
            events,
            states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_core::time::fixed_now;

    #[tokio::test]
    async fn sequence_is_assigned_once_and_monotonic() {
        let repo = InMemoryRepository::new();
        let a = SessionId::new("a");
        let b = SessionId::new("b");

        let first = repo.start_session(&a, 600, 10, fixed_now()).await.unwrap();
        let second = repo.start_session(&b, 600, 10, fixed_now()).await.unwrap();
        assert!(second.sequence_number() > first.sequence_number());

        // Re-reset keeps the original sequence number.
        let again = repo.start_session(&a, 900, 12, fixed_now()).await.unwrap();
        assert_eq!(again.sequence_number(), first.sequence_number());
        assert_eq!(again.countdown_duration_seconds(), 900);
        assert_eq!(again.finishing_team_count(), 0);
    }

    #[tokio::test]
    async fn events_append_list_and_clear() {
        let repo = InMemoryRepository::new();
        let id = SessionId::new("s1");

        repo.append_event(&ScanEvent::new(id.clone(), 30, fixed_now()))
            .await
            .unwrap();
        repo.append_event(&ScanEvent::new(id.clone(), 10, fixed_now()))
            .await
            .unwrap();

        let events = repo.list_events(&id).await.unwrap();
        assert_eq!(events.len(), 2);
        // Arrival order, not elapsed order.
        assert_eq!(events[0].elapsed_seconds, 30);

        repo.clear_events(&id).await.unwrap();
        assert!(repo.list_events(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finishing_count_requires_existing_row() {
        let repo = InMemoryRepository::new();
        let err = repo
            .update_finishing_count(&SessionId::new("ghost"), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn session_state_upserts() {
        let repo = InMemoryRepository::new();
        let id = SessionId::new("s1");
        assert!(repo.get_state(&id).await.unwrap().is_none());

        let config = SessionConfig {
            countdown_minutes: Some(45),
            team_count: Some(8),
            ..SessionConfig::default()
        };
        repo.set_state(&id, &config).await.unwrap();
        assert_eq!(repo.get_state(&id).await.unwrap(), Some(config));
    }
}
