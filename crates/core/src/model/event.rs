use chrono::{DateTime, Utc};

use crate::model::ids::SessionId;

/// Record of a single completion scan.
///
/// Stores which session the scan belongs to, how many seconds had elapsed
/// since the countdown started, and the wall-clock arrival time. Storage
/// order is arrival order; consumers that need elapsed-time ordering must
/// sort themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub session_id: SessionId,
    pub elapsed_seconds: u32,
    pub recorded_at: DateTime<Utc>,
}

impl ScanEvent {
    /// Creates a new scan event.
    #[must_use]
    pub fn new(session_id: SessionId, elapsed_seconds: u32, recorded_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            elapsed_seconds,
            recorded_at,
        }
    }
}
