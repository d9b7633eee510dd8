#![forbid(unsafe_code)]

pub mod analytics;
pub mod model;
pub mod time;

pub use analytics::{compute, CountdownQuarter, StatisticsReport};
pub use model::{
    CachedAnalytics, Quartiles, ScanEvent, SessionConfig, SessionId, SessionStats,
    SessionStatsError, SessionStatus,
};
pub use time::Clock;
