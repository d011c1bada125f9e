//! # Request Handler
//!
//! Turns one inbound request message into one backend call and at most one
//! reply.
//!
//! ## Flow
//!
//! ```text
//! topic -> Operation -> (response topic, correlation data) -> payload
//!       -> credentials -> SimulationBackend -> reply on response topic
//! ```
//!
//! Anything wrong with the request itself is logged and dropped; the
//! requester's own timeout covers it. Backend failures become error replies
//! (`Status = Error`) unless disabled.

use crate::domain::{DispatchError, RecentRequestFilter};
use crate::ports::{BackendError, SimulationBackend};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{BusMessage, MessageBus};
use shared_types::{
    Credentials, ExecuteEventRequest, ExecuteValueEventRequest, Operation, OperationRoutes,
    SimulationRef, StartSimulationRequest, StartSimulationResponse, STATUS_ERROR,
    STATUS_PROPERTY,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// A decoded request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRequest {
    StartSimulation(StartSimulationRequest),
    GetEnabledEvents(SimulationRef),
    ExecuteEvent(ExecuteEventRequest),
    ExecuteValueEvent(ExecuteValueEventRequest),
    Terminate(SimulationRef),
    GetLog(SimulationRef),
}

impl DecodedRequest {
    /// Decode the payload expected for `operation`.
    pub fn decode(operation: Operation, payload: &[u8]) -> Result<Self, DispatchError> {
        Ok(match operation {
            Operation::StartSimulation => Self::StartSimulation(parse(operation, payload)?),
            Operation::GetEnabledEvents => Self::GetEnabledEvents(parse(operation, payload)?),
            Operation::ExecuteEvent => Self::ExecuteEvent(parse(operation, payload)?),
            Operation::ExecuteValueEvent => Self::ExecuteValueEvent(parse(operation, payload)?),
            Operation::Terminate => Self::Terminate(parse(operation, payload)?),
            Operation::GetLog => Self::GetLog(parse(operation, payload)?),
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::StartSimulation(_) => Operation::StartSimulation,
            Self::GetEnabledEvents(_) => Operation::GetEnabledEvents,
            Self::ExecuteEvent(_) => Operation::ExecuteEvent,
            Self::ExecuteValueEvent(_) => Operation::ExecuteValueEvent,
            Self::Terminate(_) => Operation::Terminate,
            Self::GetLog(_) => Operation::GetLog,
        }
    }
}

fn parse<T: DeserializeOwned>(operation: Operation, payload: &[u8]) -> Result<T, DispatchError> {
    serde_json::from_slice(payload).map_err(|e| DispatchError::InvalidPayload {
        operation,
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(operation: Operation, value: &T) -> Result<Bytes, DispatchError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| DispatchError::Encode {
            operation,
            reason: e.to_string(),
        })
}

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Normal reply published.
    Replied,
    /// Backend failed; an error reply was published.
    ErrorReplied,
}

/// Dispatcher counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub received: AtomicU64,
    pub replied: AtomicU64,
    pub dropped: AtomicU64,
    pub failed: AtomicU64,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            received: self.received.load(Ordering::Relaxed),
            replied: self.replied.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DispatchStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    /// Requests taken off the bus
    pub received: u64,
    /// Replies published, including error replies
    pub replied: u64,
    /// Requests that produced no reply
    pub dropped: u64,
    /// Requests whose backend call failed
    pub failed: u64,
}

/// Handles request messages for one dispatcher instance.
pub struct RequestHandler {
    routes: OperationRoutes,
    backend: Arc<dyn SimulationBackend>,
    bus: Arc<dyn MessageBus>,
    reply_on_backend_error: bool,
    dedup: Option<RecentRequestFilter>,
    stats: Arc<DispatchStats>,
}

impl RequestHandler {
    pub fn new(
        routes: OperationRoutes,
        backend: Arc<dyn SimulationBackend>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            routes,
            backend,
            bus,
            reply_on_backend_error: true,
            dedup: None,
            stats: Arc::new(DispatchStats::default()),
        }
    }

    pub fn with_error_replies(mut self, enabled: bool) -> Self {
        self.reply_on_backend_error = enabled;
        self
    }

    pub fn with_dedup(mut self, filter: RecentRequestFilter) -> Self {
        self.dedup = Some(filter);
        self
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Handle one message, updating counters and logging the outcome.
    pub async fn process(&self, message: BusMessage) {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        match self.handle(message).await {
            Ok(Handled::Replied) => {
                self.stats.replied.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Handled::ErrorReplied) => {
                self.stats.replied.fetch_add(1, Ordering::Relaxed);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                if matches!(e, DispatchError::Backend { .. } | DispatchError::Encode { .. }) {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                }
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                if e.is_rejection() {
                    warn!(error = %e, "Request dropped");
                } else {
                    warn!(error = %e, "Request produced no reply");
                }
            }
        }
    }

    /// Handle one message.
    #[instrument(skip(self, message), fields(topic = %message.topic))]
    pub async fn handle(&self, message: BusMessage) -> Result<Handled, DispatchError> {
        let operation = self
            .routes
            .resolve(&message.topic)
            .ok_or_else(|| DispatchError::UnknownTopic(message.topic.clone()))?;

        let response_topic = message
            .response_topic
            .clone()
            .ok_or(DispatchError::MissingResponseTopic)?;
        let correlation_data = message
            .correlation_data
            .clone()
            .ok_or(DispatchError::MissingCorrelationData)?;

        let request = DecodedRequest::decode(operation, &message.payload)?;
        let credentials = Credentials::from_properties(&message.user_properties)
            .ok_or(DispatchError::MissingCredentials)?;

        if let Some(filter) = &self.dedup {
            if !filter.check_and_insert(&response_topic, &correlation_data) {
                return Err(DispatchError::Duplicate);
            }
        }

        debug!(%operation, user = %credentials.username, "Calling backend");

        let (payload, handled) = match self.invoke(&request, &credentials).await {
            Ok(payload) => (payload, Handled::Replied),
            Err(e) => {
                let remote = match e.remote_error() {
                    Some(remote) if self.reply_on_backend_error => remote,
                    _ => return Err(e),
                };
                warn!(%operation, error = %e, "Backend call failed, sending error reply");
                (encode(operation, &remote)?, Handled::ErrorReplied)
            }
        };

        let mut reply =
            BusMessage::new(response_topic, payload).with_correlation_data(correlation_data);
        if handled == Handled::ErrorReplied {
            reply = reply.with_user_property(STATUS_PROPERTY, STATUS_ERROR);
        }

        self.bus.publish(reply).await?;
        Ok(handled)
    }

    /// Run the backend call for a decoded request and encode its result.
    async fn invoke(
        &self,
        request: &DecodedRequest,
        credentials: &Credentials,
    ) -> Result<Bytes, DispatchError> {
        let operation = request.operation();
        let backend = |source: BackendError| DispatchError::Backend { operation, source };

        match request {
            DecodedRequest::StartSimulation(req) => {
                let sim_id = self
                    .backend
                    .start_simulation(&req.graph_id, credentials)
                    .await
                    .map_err(backend)?;
                encode(operation, &StartSimulationResponse { sim_id })
            }
            DecodedRequest::GetEnabledEvents(sim) => {
                let events = self
                    .backend
                    .get_enabled_events(&sim.graph_id, &sim.sim_id, credentials)
                    .await
                    .map_err(backend)?;
                encode(operation, &events)
            }
            DecodedRequest::ExecuteEvent(req) => {
                self.backend
                    .execute_event(
                        &req.graph_id,
                        &req.sim_id,
                        &req.event_id,
                        req.value.as_deref(),
                        credentials,
                    )
                    .await
                    .map_err(backend)?;
                Ok(Bytes::new())
            }
            DecodedRequest::ExecuteValueEvent(req) => {
                let result = self
                    .backend
                    .execute_value_event(
                        &req.graph_id,
                        &req.sim_id,
                        &req.event_id,
                        &req.value,
                        credentials,
                    )
                    .await
                    .map_err(backend)?;
                encode(operation, &result)
            }
            DecodedRequest::Terminate(sim) => {
                self.backend
                    .terminate(&sim.graph_id, &sim.sim_id, credentials)
                    .await
                    .map_err(backend)?;
                Ok(Bytes::new())
            }
            DecodedRequest::GetLog(sim) => {
                let log = self
                    .backend
                    .get_log(&sim.graph_id, &sim.sim_id, credentials)
                    .await
                    .map_err(backend)?;
                encode(operation, &log)
            }
        }
    }
}
