//! Runtime wiring: one bus, a pool of dispatchers, scenario clients.

use crate::config::AppConfig;
use crate::scenario::{LazyUserScenario, ScenarioError, ScenarioOutcome};
use anyhow::{Context, Result};
use dcr_01_requester::{generate_client_id, DcrClient, RequesterConfig};
use dcr_02_dispatcher::{DispatchSnapshot, DispatcherService, SimulationBackend};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared_bus::{InMemoryMessageBus, MessageBus};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// The running bridge.
pub struct DcrRuntime {
    config: AppConfig,
    bus: Arc<InMemoryMessageBus>,
    dispatchers: Vec<DispatcherService>,
}

impl DcrRuntime {
    /// Create the bus and start `scenario.workers` dispatcher instances in
    /// the same share group.
    pub async fn start(config: AppConfig, backend: Arc<dyn SimulationBackend>) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        info!("===========================================");
        info!("  DCR Bridge Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Backend: {}", config.backend.base_url);
        info!("===========================================");

        let bus = Arc::new(InMemoryMessageBus::with_capacity(
            config.broker.channel_capacity,
        ));

        let mut dispatchers = Vec::with_capacity(config.scenario.workers);
        for worker in 0..config.scenario.workers {
            let service = DispatcherService::start(
                bus.clone(),
                Arc::clone(&backend),
                config.dispatcher.clone(),
            )
            .await
            .with_context(|| format!("failed to start dispatcher {worker}"))?;
            dispatchers.push(service);
        }
        info!(
            "[dcr-02] {} dispatcher(s) sharing group '{}'",
            dispatchers.len(),
            config.dispatcher.share_group
        );

        Ok(Self {
            config,
            bus,
            dispatchers,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bus(&self) -> Arc<dyn MessageBus> {
        self.bus.clone()
    }

    /// Connect a requester with its own client id.
    pub async fn connect_client(&self) -> Result<DcrClient> {
        let config = RequesterConfig {
            client_id: generate_client_id(),
            ..self.config.requester.clone()
        };
        DcrClient::connect(self.bus(), config)
            .await
            .context("failed to connect requester")
    }

    /// Run the lazy-user scenario with `scenario.clients` concurrent clients.
    ///
    /// Outcomes are returned in client order. Client `n` seeds its random
    /// picks with `seed + n` when a seed is given.
    pub async fn run_scenario(
        &self,
        seed: Option<u64>,
    ) -> Result<Vec<Result<ScenarioOutcome, ScenarioError>>> {
        let scenario = Arc::new(LazyUserScenario::new(
            self.config.scenario.detector_graph.clone(),
            self.config.scenario.customer_graph.clone(),
            self.config.scenario.rounds,
        ));

        let mut tasks = JoinSet::new();
        for n in 0..self.config.scenario.clients {
            let client = self.connect_client().await?;
            let scenario = Arc::clone(&scenario);
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(n as u64)),
                None => StdRng::from_entropy(),
            };
            tasks.spawn(async move {
                let outcome = scenario.run(&client, &mut rng).await;
                client.shutdown().await;
                (n, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(self.config.scenario.clients);
        while let Some(joined) = tasks.join_next().await {
            let (n, outcome) = joined.context("scenario client panicked")?;
            if let Err(e) = &outcome {
                error!(client = n, error = %e, "Scenario client failed");
            }
            outcomes.push((n, outcome));
        }
        outcomes.sort_by_key(|(n, _)| *n);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Combined dispatcher counters.
    pub fn dispatch_stats(&self) -> DispatchSnapshot {
        self.dispatchers
            .iter()
            .map(DispatcherService::stats)
            .fold(DispatchSnapshot::default(), |total, s| DispatchSnapshot {
                received: total.received + s.received,
                replied: total.replied + s.replied,
                dropped: total.dropped + s.dropped,
                failed: total.failed + s.failed,
            })
    }

    /// Stop every dispatcher, letting in-flight requests finish.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        for dispatcher in &self.dispatchers {
            dispatcher.shutdown().await;
        }
        info!(
            published = self.bus.messages_published(),
            stats = ?self.dispatch_stats(),
            "Shutdown complete"
        );
    }
}
