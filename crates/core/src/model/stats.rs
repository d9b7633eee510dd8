use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::SessionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStatsError {
    #[error("countdown duration must be positive")]
    ZeroDuration,

    #[error("unknown session status: {0}")]
    UnknownStatus(String),
}

//
// ─── SESSION STATUS ───────────────────────────────────────────────────────────
//

/// Lifecycle state of a checkpoint session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Countdown is (or was last known to be) running.
    Active,
    /// Facilitator ended the session normally.
    Completed,
    /// Session was started but never wrapped up.
    Abandoned,
}

impl SessionStatus {
    /// Stable string form used in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        }
    }

    /// Parses the storage string form.
    ///
    /// # Errors
    ///
    /// Returns `SessionStatsError::UnknownStatus` for anything else.
    pub fn parse(raw: &str) -> Result<Self, SessionStatsError> {
        match raw {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "abandoned" => Ok(Self::Abandoned),
            other => Err(SessionStatsError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── CACHED ANALYTICS ─────────────────────────────────────────────────────────
//

/// The three quartile boundaries of a sorted sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

/// Derived analytics cached on the stats row.
///
/// Times are in seconds, rates in percent. All fields are recomputed on
/// demand by the statistics query; a stale or absent cache is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnalytics {
    pub median_completion_seconds: f64,
    pub quartiles: Quartiles,
    pub early_completion_rate: f64,
    pub late_completion_rate: f64,
    pub participation_rate: f64,
    pub completion_spread_seconds: u32,
    pub peak_completion_period: crate::analytics::CountdownQuarter,
}

//
// ─── SESSION STATS ────────────────────────────────────────────────────────────
//

/// Durable per-session summary row.
///
/// One row per session id. Created on the first timer reset; later resets
/// update the row in place and keep the originally assigned sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    session_id: SessionId,
    countdown_duration_seconds: u32,
    starting_team_count: u32,
    finishing_team_count: u32,
    sequence_number: i64,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    cached: Option<CachedAnalytics>,
}

impl SessionStats {
    /// Builds the row for a freshly started countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionStatsError::ZeroDuration` if the countdown duration
    /// is zero.
    pub fn start(
        session_id: SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
        sequence_number: i64,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionStatsError> {
        Self::from_persisted(
            session_id,
            countdown_duration_seconds,
            starting_team_count,
            0,
            sequence_number,
            SessionStatus::Active,
            started_at,
            None,
        )
    }

    /// Rehydrate a stats row from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStatsError::ZeroDuration` if the countdown duration
    /// is zero.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        countdown_duration_seconds: u32,
        starting_team_count: u32,
        finishing_team_count: u32,
        sequence_number: i64,
        status: SessionStatus,
        started_at: DateTime<Utc>,
        cached: Option<CachedAnalytics>,
    ) -> Result<Self, SessionStatsError> {
        if countdown_duration_seconds == 0 {
            return Err(SessionStatsError::ZeroDuration);
        }

        Ok(Self {
            session_id,
            countdown_duration_seconds,
            starting_team_count,
            finishing_team_count,
            sequence_number,
            status,
            started_at,
            cached,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn countdown_duration_seconds(&self) -> u32 {
        self.countdown_duration_seconds
    }

    #[must_use]
    pub fn starting_team_count(&self) -> u32 {
        self.starting_team_count
    }

    #[must_use]
    pub fn finishing_team_count(&self) -> u32 {
        self.finishing_team_count
    }

    #[must_use]
    pub fn sequence_number(&self) -> i64 {
        self.sequence_number
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn cached(&self) -> Option<&CachedAnalytics> {
        self.cached.as_ref()
    }

    /// Mirrors the live registry count onto the durable row.
    pub fn set_finishing_team_count(&mut self, count: u32) {
        self.finishing_team_count = count;
    }

    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
    }

    pub fn set_cached(&mut self, cached: Option<CachedAnalytics>) {
        self.cached = cached;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn start_rejects_zero_duration() {
        let err = SessionStats::start(SessionId::new("s1"), 0, 10, 1, fixed_now()).unwrap_err();
        assert_eq!(err, SessionStatsError::ZeroDuration);
    }

    #[test]
    fn start_yields_active_zero_count_row() {
        let stats = SessionStats::start(SessionId::new("s1"), 600, 12, 7, fixed_now()).unwrap();
        assert_eq!(stats.status(), SessionStatus::Active);
        assert_eq!(stats.finishing_team_count(), 0);
        assert_eq!(stats.sequence_number(), 7);
        assert!(stats.cached().is_none());
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Completed,
            SessionStatus::Abandoned,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(SessionStatus::parse("paused").is_err());
    }
}
