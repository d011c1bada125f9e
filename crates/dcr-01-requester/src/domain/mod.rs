//! Domain types for the requester.
//!
//! Configuration, error taxonomy and the pending call table.

pub mod config;
pub mod error;
pub mod pending;

pub use config::{generate_client_id, ConfigError, RequesterConfig, DEFAULT_CALL_TIMEOUT};
pub use error::{CallError, RequesterError};
pub use pending::{PendingCallStore, PendingGuard, PendingSnapshot, PendingStats};
