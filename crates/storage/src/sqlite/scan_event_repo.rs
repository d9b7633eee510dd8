use checkpoint_core::model::{ScanEvent, SessionId};

use super::{SqliteRepository, mapping::map_event_row};
use crate::repository::{ScanEventRepository, StorageError};

#[async_trait::async_trait]
impl ScanEventRepository for SqliteRepository {
    async fn append_event(&self, event: &ScanEvent) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO scan_events (session_id, elapsed_seconds, recorded_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(event.session_id.as_str())
        .bind(i64::from(event.elapsed_seconds))
        .bind(event.recorded_at)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn list_events(&self, session_id: &SessionId) -> Result<Vec<ScanEvent>, StorageError> {
        // Insertion (arrival) order; elapsed-time ordering is left to the
        // analytics engine.
        let rows = sqlx::query(
            r"
                SELECT session_id, elapsed_seconds, recorded_at
                FROM scan_events
                WHERE session_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(session_id.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_event_row(&row)?);
        }
        Ok(out)
    }

    async fn clear_events(&self, session_id: &SessionId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM scan_events WHERE session_id = ?1")
            .bind(session_id.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
