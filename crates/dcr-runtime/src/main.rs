//! `dcr-runtime` - run the DCR bridge and the lazy-user scenario.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use dcr_02_dispatcher::DcrHttpBackend;
use dcr_runtime::logging::init_logging;
use dcr_runtime::{AppConfig, DcrRuntime, Verdict};

/// Correlation-based RPC bridge to the DCR simulation API
#[derive(Parser, Debug)]
#[command(name = "dcr-runtime")]
#[command(about = "Runs DCR dispatchers and the lazy-user fraud detection scenario")]
struct Args {
    /// JSON configuration file (appsettings.json layout)
    #[arg(short, long, env = "DCR_CONFIG")]
    config: Option<PathBuf>,

    /// Detector graph id
    #[arg(long)]
    detector_graph: Option<String>,

    /// Customer behaviour graph id (1822880: suspicious, 1822881: good)
    #[arg(long)]
    customer_graph: Option<String>,

    /// Concurrent scenario clients
    #[arg(long)]
    clients: Option<usize>,

    /// Dispatcher instances in the share group
    #[arg(long)]
    workers: Option<usize>,

    /// Seed for the weighted event picks
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(graph) = &self.detector_graph {
            config.scenario.detector_graph = graph.clone();
        }
        if let Some(graph) = &self.customer_graph {
            config.scenario.customer_graph = graph.clone();
        }
        if let Some(clients) = self.clients {
            config.scenario.clients = clients;
        }
        if let Some(workers) = self.workers {
            config.scenario.workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;

    let mut config =
        AppConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    args.apply(&mut config);

    if config.requester.credentials.username.is_empty() {
        warn!("No DCR credentials configured; set DCR_USERNAME and DCR_PASSWORD");
    }

    let backend =
        Arc::new(DcrHttpBackend::new(&config.backend).context("failed to build HTTP backend")?);
    let runtime = DcrRuntime::start(config, backend).await?;

    info!("Running scenario. Press Ctrl+C to stop.");
    tokio::select! {
        outcomes = runtime.run_scenario(args.seed) => {
            for (n, outcome) in outcomes?.iter().enumerate() {
                match outcome {
                    Ok(outcome) => {
                        println!("Client {} ({}):", n + 1, outcome.client_id);
                        for label in &outcome.executed {
                            println!("  {label}");
                        }
                        match outcome.verdict {
                            Verdict::Suspicious => println!("  SUS DETECTED"),
                            Verdict::Clean => println!("  Finished with no sus"),
                        }
                    }
                    Err(e) => println!("Client {} failed: {e}", n + 1),
                }
            }
            println!("All producers done");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            warn!("Interrupted, stopping");
        }
    }

    runtime.shutdown().await;
    Ok(())
}
