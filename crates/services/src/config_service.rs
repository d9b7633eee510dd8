//! Per-session display configuration, stored as an opaque blob.

use std::sync::Arc;

use checkpoint_core::model::{SessionConfig, SessionId};
use storage::repository::{SessionStateRepository, Storage};

use crate::error::CheckpointError;

/// Reads and writes the per-session configuration blob. The service does not
/// interpret the contents beyond the typed fields; unknown keys ride along.
pub struct SessionConfigService {
    states: Arc<dyn SessionStateRepository>,
}

impl SessionConfigService {
    #[must_use]
    pub fn new(storage: &Storage) -> Self {
        Self {
            states: Arc::clone(&storage.states),
        }
    }

    /// Stored configuration for a session, `None` if never saved.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn get(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionConfig>, CheckpointError> {
        Ok(self.states.get_state(session_id).await?)
    }

    /// Save (upsert) the configuration for a session.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn set(
        &self,
        session_id: &SessionId,
        config: &SessionConfig,
    ) -> Result<(), CheckpointError> {
        self.states.set_state(session_id, config).await?;
        tracing::debug!(session = %session_id, "session configuration saved");
        Ok(())
    }
}
