#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ScanEventRepository, SessionStateRepository, SessionStatsRepository, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
