//! Shared test fixtures.
//!
//! `ScriptedBackend` is an in-memory stand-in for the DCR simulation API:
//! graphs are scripted up front, each started simulation gets its own copy
//! of the graph's events, and executing an event can make other events
//! pending. `Harness` wires a bus, a pool of dispatchers and clients.

use async_trait::async_trait;
use dcr_01_requester::{generate_client_id, DcrClient, RequesterConfig};
use dcr_02_dispatcher::{BackendError, DispatcherConfig, DispatcherService, SimulationBackend};
use shared_bus::InMemoryMessageBus;
use shared_types::{Credentials, DcrEvent, EnabledEvents, ExecutionResult, LogEntry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const USERNAME: &str = "alice@example.com";
pub const PASSWORD: &str = "hunter2";

pub fn credentials() -> Credentials {
    Credentials::new(USERNAME, PASSWORD)
}

pub fn event(id: &str, label: &str, description: &str, enabled: bool, pending: bool) -> DcrEvent {
    DcrEvent {
        event_id: id.into(),
        label: label.into(),
        description: description.into(),
        enabled,
        pending,
    }
}

/// Initial state and behaviour of one graph.
#[derive(Debug, Clone, Default)]
pub struct GraphScript {
    events: Vec<DcrEvent>,
    /// Executing the key makes each listed event enabled and pending
    responses: HashMap<String, Vec<String>>,
    /// Global store value reported after executing the key
    store: HashMap<String, String>,
    /// Delay applied to every call on this graph
    delay: Option<Duration>,
}

impl GraphScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(mut self, event: DcrEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_response(mut self, trigger: &str, target: &str) -> Self {
        self.responses
            .entry(trigger.to_string())
            .or_default()
            .push(target.to_string());
        self
    }

    pub fn with_store_value(mut self, event_id: &str, value: &str) -> Self {
        self.store.insert(event_id.to_string(), value.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug)]
struct Simulation {
    graph_id: String,
    events: Vec<DcrEvent>,
    log: Vec<LogEntry>,
    terminated: bool,
}

#[derive(Debug, Default)]
struct BackendState {
    next_sim: u64,
    sims: HashMap<String, Simulation>,
    calls: Vec<String>,
}

/// Scripted in-memory DCR backend.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    graphs: HashMap<String, GraphScript>,
    state: Mutex<BackendState>,
}

fn not_found(what: &str) -> BackendError {
    BackendError::Status {
        status: 404,
        body: format!("{what} not found"),
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(mut self, graph_id: &str, script: GraphScript) -> Self {
        self.graphs.insert(graph_id.to_string(), script);
        self
    }

    /// Every backend call so far, as `"<op> <graph>[/<sim>[/<event>]]"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn is_terminated(&self, sim_id: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .sims
            .get(sim_id)
            .map(|s| s.terminated)
            .unwrap_or(false)
    }

    async fn enter(
        &self,
        graph_id: &str,
        call: String,
        credentials: &Credentials,
    ) -> Result<&GraphScript, BackendError> {
        if credentials.username != USERNAME || credentials.password != PASSWORD {
            return Err(BackendError::Status {
                status: 401,
                body: "Unauthorized".into(),
            });
        }
        let script = self.graphs.get(graph_id).ok_or_else(|| not_found("graph"))?;
        self.state.lock().unwrap().calls.push(call);
        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(script)
    }

    fn with_sim<T>(
        &self,
        graph_id: &str,
        sim_id: &str,
        f: impl FnOnce(&mut Simulation) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut state = self.state.lock().unwrap();
        let sim = state
            .sims
            .get_mut(sim_id)
            .filter(|s| s.graph_id == graph_id && !s.terminated)
            .ok_or_else(|| not_found("simulation"))?;
        f(sim)
    }

    fn execute(
        &self,
        script: &GraphScript,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
    ) -> Result<(), BackendError> {
        self.with_sim(graph_id, sim_id, |sim| {
            let event = sim
                .events
                .iter_mut()
                .find(|e| e.event_id == event_id)
                .ok_or_else(|| not_found("event"))?;
            if !event.enabled {
                return Err(BackendError::Status {
                    status: 400,
                    body: format!("event {event_id} is not enabled"),
                });
            }
            event.pending = false;

            for target in script.responses.get(event_id).into_iter().flatten() {
                if let Some(t) = sim.events.iter_mut().find(|e| &e.event_id == target) {
                    t.enabled = true;
                    t.pending = true;
                }
            }

            let id = sim.log.len() as i64 + 1;
            sim.log.push(LogEntry {
                id,
                kind: "ExecuteEvent".into(),
                event_id: event_id.to_string(),
            });
            Ok(())
        })
    }
}

#[async_trait]
impl SimulationBackend for ScriptedBackend {
    async fn start_simulation(
        &self,
        graph_id: &str,
        credentials: &Credentials,
    ) -> Result<String, BackendError> {
        let script = self
            .enter(graph_id, format!("start {graph_id}"), credentials)
            .await?;
        let mut state = self.state.lock().unwrap();
        state.next_sim += 1;
        let sim_id = format!("{graph_id}-{}", state.next_sim);
        state.sims.insert(
            sim_id.clone(),
            Simulation {
                graph_id: graph_id.to_string(),
                events: script.events.clone(),
                log: Vec::new(),
                terminated: false,
            },
        );
        Ok(sim_id)
    }

    async fn get_enabled_events(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<EnabledEvents, BackendError> {
        self.enter(graph_id, format!("events {graph_id}/{sim_id}"), credentials)
            .await?;
        self.with_sim(graph_id, sim_id, |sim| {
            let events: Vec<DcrEvent> = sim.events.iter().filter(|e| e.enabled).cloned().collect();
            Ok(EnabledEvents {
                is_accepting: !events.iter().any(|e| e.pending),
                events,
            })
        })
    }

    async fn execute_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        _value: Option<&str>,
        credentials: &Credentials,
    ) -> Result<(), BackendError> {
        let script = self
            .enter(graph_id, format!("execute {graph_id}/{sim_id}/{event_id}"), credentials)
            .await?;
        self.execute(script, graph_id, sim_id, event_id)
    }

    async fn execute_value_event(
        &self,
        graph_id: &str,
        sim_id: &str,
        event_id: &str,
        value: &str,
        credentials: &Credentials,
    ) -> Result<ExecutionResult, BackendError> {
        let script = self
            .enter(
                graph_id,
                format!("value {graph_id}/{sim_id}/{event_id}={value}"),
                credentials,
            )
            .await?;
        self.execute(script, graph_id, sim_id, event_id)?;
        Ok(script
            .store
            .get(event_id)
            .map(|v| ExecutionResult::from([(event_id.to_string(), v.clone())]))
            .unwrap_or_default())
    }

    async fn terminate(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<(), BackendError> {
        self.enter(graph_id, format!("terminate {graph_id}/{sim_id}"), credentials)
            .await?;
        self.with_sim(graph_id, sim_id, |sim| {
            sim.terminated = true;
            Ok(())
        })
    }

    async fn get_log(
        &self,
        graph_id: &str,
        sim_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<LogEntry>, BackendError> {
        self.enter(graph_id, format!("log {graph_id}/{sim_id}"), credentials)
            .await?;
        self.with_sim(graph_id, sim_id, |sim| Ok(sim.log.clone()))
    }
}

/// Bus, dispatcher pool and backend for one test.
pub struct Harness {
    pub bus: Arc<InMemoryMessageBus>,
    pub backend: Arc<ScriptedBackend>,
    pub dispatchers: Vec<DispatcherService>,
}

impl Harness {
    pub async fn start(backend: ScriptedBackend, workers: usize) -> Self {
        Self::with_config(backend, workers, DispatcherConfig::default()).await
    }

    pub async fn with_config(
        backend: ScriptedBackend,
        workers: usize,
        config: DispatcherConfig,
    ) -> Self {
        let bus = Arc::new(InMemoryMessageBus::new());
        let backend = Arc::new(backend);
        let mut dispatchers = Vec::new();
        for _ in 0..workers {
            dispatchers.push(
                DispatcherService::start(bus.clone(), backend.clone(), config.clone())
                    .await
                    .unwrap(),
            );
        }
        Self {
            bus,
            backend,
            dispatchers,
        }
    }

    pub async fn client(&self, call_timeout: Duration) -> DcrClient {
        let config = RequesterConfig {
            client_id: generate_client_id(),
            call_timeout,
            credentials: credentials(),
            ..RequesterConfig::default()
        };
        DcrClient::connect(self.bus.clone(), config).await.unwrap()
    }

    /// Requests received across the pool.
    pub fn received(&self) -> u64 {
        self.dispatchers.iter().map(|d| d.stats().received).sum()
    }

    pub fn dropped(&self) -> u64 {
        self.dispatchers.iter().map(|d| d.stats().dropped).sum()
    }

    pub async fn shutdown(&self) {
        for dispatcher in &self.dispatchers {
            dispatcher.shutdown().await;
        }
    }
}
