//! # Scenario Flows
//!
//! The lazy-user scenario end to end through `DcrRuntime`, against
//! scripted detector and customer graphs.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dcr_runtime::config::{DEFAULT_CUSTOMER_GRAPH, DEFAULT_DETECTOR_GRAPH, GOOD_CUSTOMER_GRAPH};
    use dcr_runtime::{AppConfig, DcrRuntime, ScenarioError, Verdict};

    use crate::fixtures::{credentials, event, GraphScript, ScriptedBackend};

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn detector() -> GraphScript {
        GraphScript::new()
            .with_event(event("d_transfer", "Transfer", "", true, false))
            .with_event(event("d_deposit", "Deposit", "", true, false))
            .with_event(event("KYC_ACTIVITY", "KYC check", "", false, false))
            .with_response("d_transfer", "KYC_ACTIVITY")
    }

    fn backend() -> ScriptedBackend {
        ScriptedBackend::new()
            .with_graph(DEFAULT_DETECTOR_GRAPH, detector())
            .with_graph(
                DEFAULT_CUSTOMER_GRAPH,
                GraphScript::new()
                    .with_event(event("transfer", "Transfer", "<p>weight: 1</p>", true, false))
                    .with_store_value("transfer", "250"),
            )
            .with_graph(
                GOOD_CUSTOMER_GRAPH,
                GraphScript::new().with_event(event("deposit", "Deposit", "", true, false)),
            )
            .with_graph(
                "unmatched",
                GraphScript::new().with_event(event("wire", "Wire", "", true, false)),
            )
    }

    fn config(customer_graph: &str, clients: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.requester.credentials = credentials();
        config.scenario.customer_graph = customer_graph.to_string();
        config.scenario.clients = clients;
        config.scenario.workers = 2;
        config
    }

    async fn start(config: AppConfig) -> (DcrRuntime, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend());
        let runtime = DcrRuntime::start(config, backend.clone()).await.unwrap();
        (runtime, backend)
    }

    // =========================================================================
    // VERDICTS
    // =========================================================================

    #[tokio::test]
    async fn test_suspicious_customer_detected() {
        let (runtime, backend) = start(config(DEFAULT_CUSTOMER_GRAPH, 3)).await;

        let outcomes = runtime.run_scenario(Some(7)).await.unwrap();
        assert_eq!(outcomes.len(), 3);

        for outcome in outcomes {
            let outcome = outcome.unwrap();
            assert_eq!(outcome.verdict, Verdict::Suspicious);
            assert_eq!(outcome.executed, ["Transfer: 250", "KYC check"]);
        }

        // Both simulations of every client were terminated
        assert_eq!(backend.count_calls("terminate"), 6);
        let mirrored = backend
            .calls()
            .into_iter()
            .filter(|c| c.starts_with(&format!("value {DEFAULT_DETECTOR_GRAPH}/")))
            .collect::<Vec<_>>();
        assert_eq!(mirrored.len(), 3);
        assert!(mirrored.iter().all(|c| c.ends_with("/d_transfer=250")));

        let stats = runtime.dispatch_stats();
        assert_eq!(stats.dropped, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.received, stats.replied);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_good_customer_runs_all_rounds() {
        let (runtime, backend) = start(config(GOOD_CUSTOMER_GRAPH, 2)).await;

        let outcomes = runtime.run_scenario(None).await.unwrap();
        assert_eq!(outcomes.len(), 2);

        let mut client_ids = Vec::new();
        for outcome in outcomes {
            let outcome = outcome.unwrap();
            assert_eq!(outcome.verdict, Verdict::Clean);
            assert_eq!(outcome.executed, vec!["Deposit: 0"; 5]);
            client_ids.push(outcome.client_id);
        }
        assert_ne!(client_ids[0], client_ids[1]);

        assert_eq!(backend.count_calls("terminate"), 0);
        assert_eq!(backend.count_calls(&format!("value {GOOD_CUSTOMER_GRAPH}/")), 10);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unmatched_label_fails_client() {
        let (runtime, _backend) = start(config("unmatched", 1)).await;

        let mut outcomes = runtime.run_scenario(Some(1)).await.unwrap();
        match outcomes.remove(0) {
            Err(ScenarioError::MissingDetectorEvent { graph_id, label }) => {
                assert_eq!(graph_id, DEFAULT_DETECTOR_GRAPH);
                assert_eq!(label, "Wire");
            }
            other => panic!("expected missing detector event, got {other:?}"),
        }

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = config(DEFAULT_CUSTOMER_GRAPH, 1);
        config.scenario.workers = 0;

        let result = DcrRuntime::start(config, Arc::new(backend())).await;
        assert!(result.is_err());
    }
}
