//! Dispatcher error types.

use crate::domain::config::ConfigError;
use crate::ports::BackendError;
use shared_bus::BusError;
use shared_types::{Operation, RemoteError, RemoteErrorCode, RouteError};
use thiserror::Error;

/// Why a single inbound request did not get a normal reply.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no operation is routed on topic {0}")]
    UnknownTopic(String),

    #[error("request has no response topic")]
    MissingResponseTopic,

    #[error("request has no correlation data")]
    MissingCorrelationData,

    #[error("request has no credentials")]
    MissingCredentials,

    #[error("invalid {operation} payload: {reason}")]
    InvalidPayload {
        operation: Operation,
        reason: String,
    },

    #[error("request already handled within the dedup window")]
    Duplicate,

    #[error("{operation} backend call failed: {source}")]
    Backend {
        operation: Operation,
        #[source]
        source: BackendError,
    },

    #[error("cannot encode {operation} result: {reason}")]
    Encode {
        operation: Operation,
        reason: String,
    },

    #[error("failed to publish reply: {0}")]
    Publish(#[from] BusError),
}

impl DispatchError {
    /// Error payload to relay to the requester, for failures that happen
    /// after the request was accepted.
    pub fn remote_error(&self) -> Option<RemoteError> {
        match self {
            DispatchError::Backend { source, .. } => {
                Some(RemoteError::new(source.remote_code(), source.to_string()))
            }
            DispatchError::Encode { reason, .. } => {
                Some(RemoteError::new(RemoteErrorCode::Internal, reason.clone()))
            }
            _ => None,
        }
    }

    /// Whether the request was rejected before reaching the backend.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            DispatchError::Backend { .. } | DispatchError::Encode { .. } | DispatchError::Publish(_)
        )
    }
}

/// Failure to bring a dispatcher up.
#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("invalid dispatcher configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid route table: {0}")]
    Route(#[from] RouteError),

    #[error("failed to subscribe to {filter}: {source}")]
    Subscribe {
        filter: String,
        #[source]
        source: BusError,
    },
}
