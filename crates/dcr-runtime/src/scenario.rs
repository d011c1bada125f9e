//! # Lazy-User Fraud Detection Scenario
//!
//! Each client runs a customer simulation and a detector simulation side by
//! side. Per round:
//!
//! 1. Pick a weighted random enabled customer event and execute it with
//!    value `"0"`.
//! 2. Execute the detector event with the same label, carrying the value the
//!    customer graph produced for that event (or `"0"`).
//! 3. Lazy user: execute every enabled and pending detector event until none
//!    remain.
//! 4. Stop early if the detector log contains `KYC_ACTIVITY`; both
//!    simulations are terminated and the client is flagged suspicious.

use dcr_01_requester::{CallError, DcrClient};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use shared_types::{DcrEvent, EnabledEvents};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Detector log event that marks a customer as suspicious.
pub const KYC_ACTIVITY: &str = "KYC_ACTIVITY";

/// Value sent with every customer event.
pub const CUSTOMER_VALUE: &str = "0";

/// Upper bound on lazy-user passes within one round.
pub const MAX_LAZY_PASSES: usize = 100;

/// Scenario result for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Suspicious,
    Clean,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Suspicious => write!(f, "SUSPICIOUS"),
            Verdict::Clean => write!(f, "clean"),
        }
    }
}

/// What one client did and concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    pub client_id: String,
    pub verdict: Verdict,
    /// Executed event labels, in order. Mirrored detector events carry their
    /// value as `label: value`.
    pub executed: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Call(#[from] CallError),

    #[error("graph {graph_id} has no enabled event to pick")]
    NoEnabledEvents { graph_id: String },

    #[error("detector graph {graph_id} has no enabled event labelled '{label}'")]
    MissingDetectorEvent { graph_id: String, label: String },
}

/// Weight of an event, from a description of the form `<p>weight: N</p>`.
///
/// Anything else weighs 1.
pub fn event_weight(description: &str) -> u32 {
    let text = description.trim();
    let text = text.strip_prefix("<p>").unwrap_or(text);
    let text = text.strip_suffix("</p>").unwrap_or(text);

    text.split_once(':')
        .and_then(|(_, weight)| weight.trim().parse().ok())
        .unwrap_or(1)
}

/// Pick an enabled event at random, proportionally to its weight.
pub fn pick_weighted<'a, R: Rng + ?Sized>(
    events: &'a EnabledEvents,
    rng: &mut R,
) -> Option<&'a DcrEvent> {
    let candidates: Vec<(&DcrEvent, u32)> = events
        .events
        .iter()
        .filter(|e| e.enabled)
        .map(|e| (e, event_weight(&e.description)))
        .filter(|(_, weight)| *weight > 0)
        .collect();

    let index = WeightedIndex::<u32>::new(candidates.iter().map(|(_, w)| *w)).ok()?;
    candidates.get(index.sample(rng)).map(|(e, _)| *e)
}

/// The lazy-user scenario for one pair of graphs.
#[derive(Debug, Clone)]
pub struct LazyUserScenario {
    pub detector_graph: String,
    pub customer_graph: String,
    pub rounds: usize,
}

impl LazyUserScenario {
    pub fn new(
        detector_graph: impl Into<String>,
        customer_graph: impl Into<String>,
        rounds: usize,
    ) -> Self {
        Self {
            detector_graph: detector_graph.into(),
            customer_graph: customer_graph.into(),
            rounds,
        }
    }

    /// Run the scenario through `client`.
    #[instrument(skip(self, client, rng), fields(client_id = %client.client_id()))]
    pub async fn run<R: Rng + Send>(
        &self,
        client: &DcrClient,
        rng: &mut R,
    ) -> Result<ScenarioOutcome, ScenarioError> {
        let detector_sim = client.start_simulation(&self.detector_graph).await?;
        let customer_sim = client.start_simulation(&self.customer_graph).await?;
        info!(%detector_sim, %customer_sim, "Simulations started");

        let mut executed = Vec::new();
        let mut verdict = Verdict::Clean;

        for round in 0..self.rounds {
            let customer_events = client
                .get_enabled_events(&self.customer_graph, &customer_sim)
                .await?;
            let picked = pick_weighted(&customer_events, rng).ok_or_else(|| {
                ScenarioError::NoEnabledEvents {
                    graph_id: self.customer_graph.clone(),
                }
            })?;
            let (customer_event, label) = (picked.event_id.clone(), picked.label.clone());

            let store = client
                .execute_value_event(
                    &self.customer_graph,
                    &customer_sim,
                    &customer_event,
                    CUSTOMER_VALUE,
                )
                .await?;

            let detector_events = client
                .get_enabled_events(&self.detector_graph, &detector_sim)
                .await?;
            let detector_event = detector_events.by_label(&label).ok_or_else(|| {
                ScenarioError::MissingDetectorEvent {
                    graph_id: self.detector_graph.clone(),
                    label: label.clone(),
                }
            })?;

            let value = store
                .get(&customer_event)
                .map(String::as_str)
                .unwrap_or(CUSTOMER_VALUE);
            client
                .execute_value_event(
                    &self.detector_graph,
                    &detector_sim,
                    &detector_event.event_id,
                    value,
                )
                .await?;
            debug!(round, %label, %value, "Mirrored customer event");
            executed.push(format!("{label}: {value}"));

            self.run_lazy_user(client, &detector_sim, &mut executed)
                .await?;

            let log = client.get_log(&self.detector_graph, &detector_sim).await?;
            if log.iter().any(|entry| entry.event_id == KYC_ACTIVITY) {
                client.terminate(&self.detector_graph, &detector_sim).await?;
                client.terminate(&self.customer_graph, &customer_sim).await?;
                verdict = Verdict::Suspicious;
                break;
            }
        }

        info!(%verdict, executed = executed.len(), "Scenario finished");
        Ok(ScenarioOutcome {
            client_id: client.client_id().to_string(),
            verdict,
            executed,
        })
    }

    /// Execute enabled and pending detector events until none remain.
    async fn run_lazy_user(
        &self,
        client: &DcrClient,
        sim_id: &str,
        executed: &mut Vec<String>,
    ) -> Result<(), ScenarioError> {
        for _ in 0..MAX_LAZY_PASSES {
            let events = client
                .get_enabled_events(&self.detector_graph, sim_id)
                .await?;
            let pending: Vec<DcrEvent> = events.pending().cloned().collect();
            if pending.is_empty() {
                return Ok(());
            }
            for event in pending {
                client
                    .execute_event(&self.detector_graph, sim_id, &event.event_id, None)
                    .await?;
                executed.push(event.label);
            }
        }
        warn!(sim_id, "Detector still has pending events after {} passes", MAX_LAZY_PASSES);
        Ok(())
    }
}
