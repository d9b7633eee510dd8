//! Wires storage, the live registry, and the services together.

use std::sync::Arc;

use checkpoint_core::Clock;
use storage::repository::Storage;

use crate::checkpoint_service::CheckpointService;
use crate::config_service::SessionConfigService;
use crate::error::AppServicesError;
use crate::registry::SessionRegistry;

/// Container for all application services, sharing one storage backend, one
/// registry, and one clock.
#[derive(Clone)]
pub struct AppServices {
    checkpoints: Arc<CheckpointService>,
    configs: Arc<SessionConfigService>,
    registry: Arc<SessionRegistry>,
}

impl AppServices {
    /// Build services over a `SQLite` database, running migrations and
    /// rehydrating the live registry from persisted sessions.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened, migrated,
    /// or read during rehydration.
    pub async fn new_sqlite(database_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(database_url).await?;
        Self::from_storage(storage, clock).await
    }

    /// Build services over in-memory repositories. Used by tests and
    /// prototyping; nothing survives the process.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if rehydration fails (it cannot for a fresh
    /// in-memory backend).
    pub async fn new_in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock).await
    }

    async fn from_storage(storage: Storage, clock: Clock) -> Result<Self, AppServicesError> {
        let registry = Arc::new(SessionRegistry::new());

        // Seed live counters from the durable finishing counts. Timers are
        // not restored; a countdown does not survive a restart.
        let now = clock.now();
        for stats in storage.sessions.list_sessions().await? {
            registry
                .rehydrate(stats.session_id(), stats.finishing_team_count(), now)
                .await;
        }
        tracing::info!(sessions = registry.len(), "session registry rehydrated");

        let checkpoints = Arc::new(CheckpointService::new(
            &storage,
            Arc::clone(&registry),
            clock,
        ));
        let configs = Arc::new(SessionConfigService::new(&storage));

        Ok(Self {
            checkpoints,
            configs,
            registry,
        })
    }

    #[must_use]
    pub fn checkpoints(&self) -> Arc<CheckpointService> {
        Arc::clone(&self.checkpoints)
    }

    #[must_use]
    pub fn configs(&self) -> Arc<SessionConfigService> {
        Arc::clone(&self.configs)
    }

    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkpoint_core::model::SessionId;
    use checkpoint_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_start_empty() {
        let services = AppServices::new_in_memory(fixed_clock()).await.unwrap();
        assert!(services.registry().is_empty());
        assert_eq!(
            services
                .checkpoints()
                .current_count(&SessionId::new("any"))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn rehydration_restores_counts_without_timers() {
        let storage = Storage::in_memory();
        let id = SessionId::new("s1");
        storage
            .sessions
            .start_session(&id, 600, 10, fixed_clock().now())
            .await
            .unwrap();
        storage.sessions.update_finishing_count(&id, 6).await.unwrap();

        let services = AppServices::from_storage(storage, fixed_clock())
            .await
            .unwrap();
        assert_eq!(services.checkpoints().current_count(&id).await, 6);

        // No countdown is running after a restart, so a scan is untimed.
        let outcome = services.checkpoints().record_scan(&id).await;
        assert_eq!(outcome.completion_count, 7);
        assert_eq!(
            outcome.durability,
            crate::checkpoint_service::ScanDurability::Untimed
        );
    }
}
