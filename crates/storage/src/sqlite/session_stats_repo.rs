use chrono::{DateTime, Utc};
use checkpoint_core::model::{CachedAnalytics, SessionId, SessionStats, SessionStatus};
use sqlx::Row;

use super::{SqliteRepository, mapping::map_stats_row, mapping::ser};
use crate::repository::{SessionStatsRepository, StorageError};

const STATS_COLUMNS: &str = r"
    session_id, countdown_duration, starting_team_count, finishing_team_count,
    sequence_number, status, session_date, session_time_utc,
    median_completion_time, quartile_q1, quartile_q2, quartile_q3,
    early_completion_rate, late_completion_rate, participation_rate,
    completion_spread, peak_completion_period
";

#[async_trait::async_trait]
impl SessionStatsRepository for SqliteRepository {
    async fn start_session(
        &self,
        session_id: &SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
        started_at: DateTime<Utc>,
    ) -> Result<SessionStats, StorageError> {
        // The sequence is computed inside the single INSERT so concurrent
        // resets of distinct new ids serialize on SQLite's one writer instead
        // of racing a read-then-write transaction upgrade. A known id keeps
        // its originally assigned sequence number (the conflict clause never
        // touches it).
        let now = Utc::now();
        sqlx::query(
            r"
                INSERT INTO session_stats (
                    session_id, countdown_duration, starting_team_count,
                    finishing_team_count, sequence_number, status,
                    session_date, session_time_utc, created_at, updated_at
                )
                VALUES (
                    ?1, ?2, ?3, 0,
                    COALESCE((SELECT MAX(sequence_number) FROM session_stats), 0) + 1,
                    ?4, ?5, ?6, ?7, ?7
                )
                ON CONFLICT(session_id) DO UPDATE SET
                    -- sequence_number and created_at keep their original values
                    countdown_duration = excluded.countdown_duration,
                    starting_team_count = excluded.starting_team_count,
                    finishing_team_count = 0,
                    status = excluded.status,
                    session_date = excluded.session_date,
                    session_time_utc = excluded.session_time_utc,
                    median_completion_time = NULL,
                    quartile_q1 = NULL,
                    quartile_q2 = NULL,
                    quartile_q3 = NULL,
                    early_completion_rate = NULL,
                    late_completion_rate = NULL,
                    participation_rate = NULL,
                    completion_spread = NULL,
                    peak_completion_period = NULL,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(session_id.as_str())
        .bind(i64::from(countdown_duration_seconds))
        .bind(i64::from(starting_team_count))
        .bind(SessionStatus::Active.as_str())
        .bind(started_at.date_naive())
        .bind(started_at.time())
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let row = sqlx::query("SELECT sequence_number FROM session_stats WHERE session_id = ?1")
            .bind(session_id.as_str())
            .fetch_one(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let sequence: i64 = row.try_get("sequence_number").map_err(ser)?;

        SessionStats::start(
            session_id.clone(),
            countdown_duration_seconds,
            starting_team_count,
            sequence,
            started_at,
        )
        .map_err(ser)
    }

    async fn get_session(&self, session_id: &SessionId) -> Result<SessionStats, StorageError> {
        let sql = format!("SELECT {STATS_COLUMNS} FROM session_stats WHERE session_id = ?1");
        let row = sqlx::query(&sql)
            .bind(session_id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_stats_row(&row)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionStats>, StorageError> {
        let sql =
            format!("SELECT {STATS_COLUMNS} FROM session_stats ORDER BY sequence_number ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_stats_row(&row)?);
        }
        Ok(out)
    }

    async fn update_finishing_count(
        &self,
        session_id: &SessionId,
        count: u32,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE session_stats
                SET finishing_team_count = ?1, updated_at = ?2
                WHERE session_id = ?3
            ",
        )
        .bind(i64::from(count))
        .bind(Utc::now())
        .bind(session_id.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn store_analytics(
        &self,
        session_id: &SessionId,
        cached: Option<&CachedAnalytics>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE session_stats
                SET median_completion_time = ?1,
                    quartile_q1 = ?2,
                    quartile_q2 = ?3,
                    quartile_q3 = ?4,
                    early_completion_rate = ?5,
                    late_completion_rate = ?6,
                    participation_rate = ?7,
                    completion_spread = ?8,
                    peak_completion_period = ?9,
                    updated_at = ?10
                WHERE session_id = ?11
            ",
        )
        .bind(cached.map(|c| c.median_completion_seconds))
        .bind(cached.map(|c| c.quartiles.q1))
        .bind(cached.map(|c| c.quartiles.q2))
        .bind(cached.map(|c| c.quartiles.q3))
        .bind(cached.map(|c| c.early_completion_rate))
        .bind(cached.map(|c| c.late_completion_rate))
        .bind(cached.map(|c| c.participation_rate))
        .bind(cached.map(|c| i64::from(c.completion_spread_seconds)))
        .bind(cached.map(|c| c.peak_completion_period.as_str()))
        .bind(Utc::now())
        .bind(session_id.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn set_status(
        &self,
        session_id: &SessionId,
        status: SessionStatus,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE session_stats
                SET status = ?1, updated_at = ?2
                WHERE session_id = ?3
            ",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(session_id.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
