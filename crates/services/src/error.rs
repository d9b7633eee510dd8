//! Shared error types for the services crate.

use thiserror::Error;

use checkpoint_core::model::{SessionId, SessionStatsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CheckpointService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CheckpointError {
    /// `statistics` was asked about a session id that has never been reset.
    /// Distinct from a session with zero activity, which yields a valid
    /// zero report.
    #[error("no statistics recorded for session {0}")]
    SessionNotFound(SessionId),

    /// Rejected at the boundary before any state changes.
    #[error("countdown duration must be positive")]
    InvalidDuration,

    #[error(transparent)]
    Stats(#[from] SessionStatsError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
