//! Requester error types.

use shared_bus::BusError;
use shared_types::{Operation, RemoteError};
use std::time::Duration;
use thiserror::Error;

use crate::domain::config::ConfigError;

/// Failure of a single remote call.
#[derive(Debug, Error)]
pub enum CallError {
    /// No reply arrived before the deadline.
    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },

    /// The reply payload did not have the expected shape.
    #[error("malformed {operation} reply: {reason}")]
    Decode {
        operation: Operation,
        reason: String,
    },

    /// The request payload could not be serialized.
    #[error("cannot encode {operation} request: {reason}")]
    Encode {
        operation: Operation,
        reason: String,
    },

    /// Publishing the request failed; nothing was sent.
    #[error("failed to publish {operation} request: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: BusError,
    },

    /// The dispatcher answered with an error-shaped reply.
    #[error("{operation} failed remotely: {error}")]
    Remote {
        operation: Operation,
        error: RemoteError,
    },

    /// The reply listener stopped while the call was waiting.
    #[error("reply listener closed")]
    ListenerClosed,
}

impl CallError {
    /// Whether this is a deadline expiry rather than an answered failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }
}

/// Failure to bring a client up.
#[derive(Debug, Error)]
pub enum RequesterError {
    #[error("invalid requester configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to subscribe to reply topic {topic}: {source}")]
    Subscribe {
        topic: String,
        #[source]
        source: BusError,
    },
}
