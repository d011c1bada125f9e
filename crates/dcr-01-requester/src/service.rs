//! DCR client - awaitable calls over the message bus.

use crate::domain::config::{ConfigError, RequesterConfig};
use crate::domain::error::{CallError, RequesterError};
use crate::domain::pending::{PendingCallStore, PendingGuard, PendingSnapshot};
use crate::ipc::ReplyListener;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{BusMessage, MessageBus};
use shared_types::{
    EnabledEvents, ExecuteEventRequest, ExecuteValueEventRequest, ExecutionResult, LogEntry,
    Operation, OperationRoutes, RemoteError, SimulationRef, StartSimulationRequest, StartSimulationResponse,
    STATUS_ERROR, STATUS_PROPERTY,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Requester for the six DCR simulation operations.
///
/// One client owns one reply listener and one pending call table; any number
/// of calls may be in flight concurrently through a shared reference.
pub struct DcrClient {
    config: RequesterConfig,
    bus: Arc<dyn MessageBus>,
    pending: Arc<PendingCallStore>,
    shutdown_tx: watch::Sender<bool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl DcrClient {
    /// Subscribe to this client's reply topics and start the reply listener.
    ///
    /// Subscriptions are in place before this returns, so no reply to a
    /// call made through the returned client can be missed.
    pub async fn connect(
        bus: Arc<dyn MessageBus>,
        mut config: RequesterConfig,
    ) -> Result<Self, RequesterError> {
        config.validate()?;
        // Topics are built from the prefix as the dispatcher routes it.
        let routes = OperationRoutes::new(&config.topic_prefix)
            .map_err(|e| ConfigError::InvalidPrefix(e.to_string()))?;
        config.topic_prefix = routes.prefix().to_string();

        let mut streams = Vec::with_capacity(Operation::ALL.len());
        for op in Operation::ALL {
            let topic = op.reply_topic(&config.topic_prefix, &config.client_id);
            let subscription = bus
                .subscribe(&topic)
                .await
                .map_err(|source| RequesterError::Subscribe {
                    topic: topic.clone(),
                    source,
                })?;
            streams.push(subscription.into_stream());
        }

        let pending = Arc::new(PendingCallStore::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = tokio::spawn(ReplyListener::new(pending.clone(), streams).run(shutdown_rx));

        info!(
            client_id = %config.client_id,
            prefix = %config.topic_prefix,
            timeout_ms = config.call_timeout.as_millis() as u64,
            "DCR client connected"
        );

        Ok(Self {
            config,
            bus,
            pending,
            shutdown_tx,
            listener: Mutex::new(Some(listener)),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn config(&self) -> &RequesterConfig {
        &self.config
    }

    /// Number of calls currently waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    pub fn stats(&self) -> PendingSnapshot {
        self.pending.snapshot()
    }

    /// Start a simulation of `graph_id`, returning the new simulation id.
    pub async fn start_simulation(&self, graph_id: &str) -> Result<String, CallError> {
        let request = StartSimulationRequest {
            graph_id: graph_id.to_string(),
        };
        let reply = self.call(Operation::StartSimulation, &request).await?;
        let response: StartSimulationResponse = decode(Operation::StartSimulation, &reply)?;
        Ok(response.sim_id)
    }

    pub async fn get_enabled_events(
        &self,
        graph_id: &str,
        sim_id: &str,
    ) -> Result<EnabledEvents, CallError> {
        let request = SimulationRef::new(graph_id, sim_id);
        let reply = self.call(Operation::GetEnabledEvents, &request).await?;
        decode(Operation::GetEnabledEvents, &reply)
    }

    /// Execute an event. `value` is only needed for data events.
    pub async fn execute_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: Option<&str>,
    ) -> Result<(), CallError> {
        let request = ExecuteEventRequest {
            graph_id: graph_id.to_string(),
            sim_id: sim_id.to_string(),
            event_id: event_id.to_string(),
            value: value.map(str::to_string),
        };
        let reply = self.call(Operation::ExecuteEvent, &request).await?;
        check_status(Operation::ExecuteEvent, &reply)
    }

    /// Execute a data event and return the simulation's global store.
    pub async fn execute_value_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: &str,
    ) -> Result<ExecutionResult, CallError> {
        let request = ExecuteValueEventRequest {
            graph_id: graph_id.to_string(),
            sim_id: sim_id.to_string(),
            event_id: event_id.to_string(),
            value: value.to_string(),
        };
        let reply = self.call(Operation::ExecuteValueEvent, &request).await?;
        decode(Operation::ExecuteValueEvent, &reply)
    }

    pub async fn terminate(&self, graph_id: &str, sim_id: &str) -> Result<(), CallError> {
        let request = SimulationRef::new(graph_id, sim_id);
        let reply = self.call(Operation::Terminate, &request).await?;
        check_status(Operation::Terminate, &reply)
    }

    pub async fn get_log(&self, graph_id: &str, sim_id: &str) -> Result<Vec<LogEntry>, CallError> {
        let request = SimulationRef::new(graph_id, sim_id);
        let reply = self.call(Operation::GetLog, &request).await?;
        decode(Operation::GetLog, &reply)
    }

    /// Publish `request` for `operation` and wait for the raw reply, using
    /// the configured call timeout.
    pub async fn call<T: Serialize>(
        &self,
        operation: Operation,
        request: &T,
    ) -> Result<BusMessage, CallError> {
        self.call_with_timeout(operation, request, self.config.call_timeout)
            .await
    }

    /// Publish `request` for `operation` and wait up to `timeout` for the
    /// raw reply.
    #[instrument(skip(self, request), fields(client_id = %self.config.client_id))]
    pub async fn call_with_timeout<T: Serialize>(
        &self,
        operation: Operation,
        request: &T,
        timeout: Duration,
    ) -> Result<BusMessage, CallError> {
        let payload = serde_json::to_vec(request).map_err(|e| CallError::Encode {
            operation,
            reason: e.to_string(),
        })?;

        let (correlation_id, mut rx) = self.pending.register(operation, timeout);
        let mut guard = PendingGuard::new(&self.pending, correlation_id);

        let message = BusMessage::new(operation.request_topic(&self.config.topic_prefix), payload)
            .with_correlation_data(correlation_id.to_vec())
            .with_response_topic(
                operation.reply_topic(&self.config.topic_prefix, &self.config.client_id),
            )
            .with_user_properties(self.config.credentials.to_properties());

        match self.bus.publish(message).await {
            Ok(receivers) => {
                debug!(
                    correlation_id = %correlation_id,
                    receivers,
                    "Sent request"
                );
            }
            Err(source) => {
                // Guard removes the entry on return.
                return Err(CallError::Transport { operation, source });
            }
        }

        let outcome = match tokio::time::timeout(timeout, &mut rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(CallError::ListenerClosed),
            Err(_) => {
                if self.pending.expire(&correlation_id) {
                    Err(CallError::Timeout { operation, timeout })
                } else {
                    // The listener won the removal; its reply is already sent.
                    rx.await.map_err(|_| CallError::ListenerClosed)
                }
            }
        };

        guard.disarm();
        outcome
    }

    /// Stop the reply listener. Calls still waiting fail with
    /// `CallError::ListenerClosed`.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.listener.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.await;
            info!(client_id = %self.config.client_id, "DCR client stopped");
        }
    }
}

impl Drop for DcrClient {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Fail with `CallError::Remote` if the reply is error-shaped.
fn check_status(operation: Operation, reply: &BusMessage) -> Result<(), CallError> {
    if reply.user_property(STATUS_PROPERTY) != Some(STATUS_ERROR) {
        return Ok(());
    }
    let error: RemoteError =
        serde_json::from_slice(&reply.payload).map_err(|e| CallError::Decode {
            operation,
            reason: format!("error reply: {}", e),
        })?;
    Err(CallError::Remote { operation, error })
}

fn decode<T: DeserializeOwned>(operation: Operation, reply: &BusMessage) -> Result<T, CallError> {
    check_status(operation, reply)?;
    serde_json::from_slice(&reply.payload).map_err(|e| CallError::Decode {
        operation,
        reason: e.to_string(),
    })
}
