//! # Shared Types Crate
//!
//! Message model shared by DCR requesters and dispatchers: the operation set
//! and its topic layout, correlation identifiers, request payloads, reply
//! entities and the credential metadata carried alongside them.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every type that crosses the bus is defined here.
//! - **Topic carries the operation**: Payloads never name their operation.
//! - **Metadata carries identity**: Payloads never contain credentials.

pub mod correlation;
pub mod entities;
pub mod errors;
pub mod humantime_serde;
pub mod ipc;
pub mod operation;
pub mod security;

pub use correlation::{CorrelationId, InvalidCorrelationData};
pub use entities::*;
pub use errors::*;
pub use ipc::*;
pub use operation::{Operation, OperationRoutes, DEFAULT_TOPIC_PREFIX};
pub use security::*;
