use checkpoint_core::model::{SessionConfig, SessionId};
use sqlx::Row;

use super::{SqliteRepository, mapping::ser};
use crate::repository::{SessionStateRepository, StorageError};

#[async_trait::async_trait]
impl SessionStateRepository for SqliteRepository {
    async fn get_state(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionConfig>, StorageError> {
        let row = sqlx::query("SELECT state FROM session_states WHERE session_id = ?1")
            .bind(session_id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("state").map_err(ser)?;
        let config = serde_json::from_str(&raw).map_err(ser)?;
        Ok(Some(config))
    }

    async fn set_state(
        &self,
        session_id: &SessionId,
        config: &SessionConfig,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(config).map_err(ser)?;

        sqlx::query(
            r"
                INSERT INTO session_states (session_id, state)
                VALUES (?1, ?2)
                ON CONFLICT(session_id) DO UPDATE SET state = excluded.state
            ",
        )
        .bind(session_id.as_str())
        .bind(raw)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
