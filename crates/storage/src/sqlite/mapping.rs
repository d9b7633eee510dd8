use checkpoint_core::analytics::CountdownQuarter;
use checkpoint_core::model::{
    CachedAnalytics, Quartiles, ScanEvent, SessionId, SessionStats, SessionStatus,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Reassembles the cached analytics block from its nullable columns.
///
/// The cache is all-or-nothing: a row with only some of the columns set is
/// treated as having no cache rather than a torn one.
#[allow(clippy::too_many_arguments)]
fn cached_from_columns(
    median: Option<f64>,
    q1: Option<f64>,
    q2: Option<f64>,
    q3: Option<f64>,
    early: Option<f64>,
    late: Option<f64>,
    participation: Option<f64>,
    spread: Option<i64>,
    peak: Option<String>,
) -> Result<Option<CachedAnalytics>, StorageError> {
    let (
        Some(median),
        Some(q1),
        Some(q2),
        Some(q3),
        Some(early),
        Some(late),
        Some(participation),
        Some(spread),
        Some(peak),
    ) = (median, q1, q2, q3, early, late, participation, spread, peak)
    else {
        return Ok(None);
    };

    let peak = CountdownQuarter::parse(&peak)
        .ok_or_else(|| StorageError::Serialization(format!("invalid peak period: {peak}")))?;

    Ok(Some(CachedAnalytics {
        median_completion_seconds: median,
        quartiles: Quartiles { q1, q2, q3 },
        early_completion_rate: early,
        late_completion_rate: late,
        participation_rate: participation,
        completion_spread_seconds: u32_from_i64("completion_spread", spread)?,
        peak_completion_period: peak,
    }))
}

pub(crate) fn map_stats_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionStats, StorageError> {
    let session_id = SessionId::new(row.try_get::<String, _>("session_id").map_err(ser)?);

    let duration = u32_from_i64(
        "countdown_duration",
        row.try_get::<i64, _>("countdown_duration").map_err(ser)?,
    )?;
    let starting = u32_from_i64(
        "starting_team_count",
        row.try_get::<i64, _>("starting_team_count").map_err(ser)?,
    )?;
    let finishing = u32_from_i64(
        "finishing_team_count",
        row.try_get::<i64, _>("finishing_team_count").map_err(ser)?,
    )?;
    let sequence: i64 = row.try_get("sequence_number").map_err(ser)?;

    let status_raw: String = row.try_get("status").map_err(ser)?;
    let status = SessionStatus::parse(&status_raw).map_err(ser)?;

    let date: chrono::NaiveDate = row.try_get("session_date").map_err(ser)?;
    let time: chrono::NaiveTime = row.try_get("session_time_utc").map_err(ser)?;
    let started_at = date.and_time(time).and_utc();

    let cached = cached_from_columns(
        row.try_get("median_completion_time").map_err(ser)?,
        row.try_get("quartile_q1").map_err(ser)?,
        row.try_get("quartile_q2").map_err(ser)?,
        row.try_get("quartile_q3").map_err(ser)?,
        row.try_get("early_completion_rate").map_err(ser)?,
        row.try_get("late_completion_rate").map_err(ser)?,
        row.try_get("participation_rate").map_err(ser)?,
        row.try_get("completion_spread").map_err(ser)?,
        row.try_get("peak_completion_period").map_err(ser)?,
    )?;

    SessionStats::from_persisted(
        session_id, duration, starting, finishing, sequence, status, started_at, cached,
    )
    .map_err(ser)
}

pub(crate) fn map_event_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScanEvent, StorageError> {
    Ok(ScanEvent {
        session_id: SessionId::new(row.try_get::<String, _>("session_id").map_err(ser)?),
        elapsed_seconds: u32_from_i64(
            "elapsed_seconds",
            row.try_get::<i64, _>("elapsed_seconds").map_err(ser)?,
        )?,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}
