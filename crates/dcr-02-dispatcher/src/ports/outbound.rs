//! Outbound ports for the dispatcher.

use async_trait::async_trait;
use shared_types::{Credentials, EnabledEvents, ExecutionResult, LogEntry, RemoteErrorCode};
use thiserror::Error;

/// Failure of a backend operation.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// StartSimulation succeeded but carried no simulation id.
    #[error("backend response is missing the simulationID header")]
    MissingSimulationId,

    /// Backend body could not be interpreted.
    #[error("cannot parse backend response: {0}")]
    Parse(String),

    /// Backend could not be reached.
    #[error("backend request failed: {0}")]
    Http(String),
}

impl BackendError {
    /// Category relayed to the requester in an error reply.
    pub fn remote_code(&self) -> RemoteErrorCode {
        match self {
            BackendError::Status { .. } => RemoteErrorCode::BackendStatus,
            BackendError::MissingSimulationId | BackendError::Parse(_) => {
                RemoteErrorCode::BackendProtocol
            }
            BackendError::Http(_) => RemoteErrorCode::BackendUnavailable,
        }
    }
}

/// The remote DCR simulation service.
///
/// Every call carries the credentials of the request that triggered it;
/// implementations must not cache sessions between calls.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    /// Start a simulation, returning its id.
    async fn start_simulation(
        &self,
        graph_id: &str,
        credentials: &Credentials,
    ) -> Result<String, BackendError>;

    async fn get_enabled_events(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<EnabledEvents, BackendError>;

    async fn execute_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: Option<&str>,
        credentials: &Credentials,
    ) -> Result<(), BackendError>;

    /// Execute a data event and return the resulting global store.
    async fn execute_value_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: &str,
        credentials: &Credentials,
    ) -> Result<ExecutionResult, BackendError>;

    async fn terminate(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<(), BackendError>;

    async fn get_log(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<LogEntry>, BackendError>;
}
