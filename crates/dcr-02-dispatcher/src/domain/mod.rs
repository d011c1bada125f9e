//! Domain types for the dispatcher.

pub mod config;
pub mod dedup;
pub mod error;

pub use config::{BackendConfig, ConfigError, DispatcherConfig, DEFAULT_BASE_URL, DEFAULT_SHARE_GROUP};
pub use dedup::RecentRequestFilter;
pub use error::{DispatchError, DispatcherError};
