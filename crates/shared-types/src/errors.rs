//! # Error Types
//!
//! Errors shared by requesters and dispatchers, plus the error-shaped reply
//! that carries a backend failure back across the bus.

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User property marking the shape of a reply payload.
pub const STATUS_PROPERTY: &str = "Status";

/// Value of [`STATUS_PROPERTY`] on an error-shaped reply.
pub const STATUS_ERROR: &str = "Error";

/// Route table construction failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Topic prefix is empty.
    #[error("topic prefix must not be empty")]
    EmptyPrefix,

    /// Topic prefix contains wildcard or reserved characters.
    #[error("invalid topic prefix: {0}")]
    InvalidPrefix(String),

    /// Two operations resolved to the same request topic.
    #[error("duplicate request topic {topic}: {first} and {second}")]
    DuplicateTopic {
        topic: String,
        first: Operation,
        second: Operation,
    },

    /// Topic segment does not name an operation.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
}

/// Failure category relayed in an error-shaped reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorCode {
    /// Backend answered with a non-success status.
    BackendStatus,
    /// Backend could not be reached.
    BackendUnavailable,
    /// Backend answered with something we could not interpret.
    BackendProtocol,
    /// Result could not be serialized.
    Internal,
}

/// Payload of a reply published with `Status = Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct RemoteError {
    /// Failure category.
    pub code: RemoteErrorCode,
    /// Human-readable detail from the dispatcher.
    pub message: String,
}

impl RemoteError {
    pub fn new(code: RemoteErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
