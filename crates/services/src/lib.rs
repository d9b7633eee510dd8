#![forbid(unsafe_code)]

pub mod app_services;
pub mod checkpoint_service;
pub mod config_service;
pub mod error;
pub mod registry;

pub use checkpoint_core::Clock;

pub use app_services::AppServices;
pub use checkpoint_service::{CheckpointService, ScanDurability, ScanOutcome};
pub use config_service::SessionConfigService;
pub use error::{AppServicesError, CheckpointError};
pub use registry::{SessionEntry, SessionRegistry};
