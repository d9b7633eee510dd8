mod config;
mod event;
mod ids;
mod stats;

pub use config::SessionConfig;
pub use event::ScanEvent;
pub use ids::SessionId;
pub use stats::{CachedAnalytics, Quartiles, SessionStats, SessionStatsError, SessionStatus};
