//! `DcrHttpBackend` request shapes and response parsing.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::Method;
    use dcr_01_requester::{generate_client_id, CallError, DcrClient, RequesterConfig};
    use dcr_02_dispatcher::{
        BackendConfig, BackendError, DcrHttpBackend, DispatcherConfig, DispatcherService,
        SimulationBackend,
    };
    use shared_bus::InMemoryMessageBus;
    use shared_types::{Credentials, RemoteErrorCode};

    use crate::http::{MockDcrApi, MOCK_SIM_ID};

    const GRAPH: &str = "1822861";

    // =========================================================================
    // REQUEST SHAPES
    // =========================================================================

    #[tokio::test]
    async fn test_start_simulation_reads_header() {
        let api = MockDcrApi::start().await;
        let backend = api.backend();

        let sim = backend
            .start_simulation(GRAPH, &MockDcrApi::credentials())
            .await
            .unwrap();
        assert_eq!(sim, MOCK_SIM_ID);

        let request = api.last_request();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, format!("/api/graphs/{GRAPH}/sims/"));
    }

    #[tokio::test]
    async fn test_enabled_events_json_string_body() {
        let api = MockDcrApi::start().await;
        let backend = api.backend();

        let events = backend
            .get_enabled_events(GRAPH, "S1", &MockDcrApi::credentials())
            .await
            .unwrap();
        assert!(!events.is_accepting);
        assert_eq!(events.events.len(), 2);
        assert_eq!(events.events[0].event_id, "Pay");
        assert_eq!(events.events[0].description, "<p>weight: 3</p>");
        assert!(events.events[0].pending);
        assert!(events.events[1].enabled && !events.events[1].pending);

        let request = api.last_request();
        assert_eq!(request.path, format!("/api/graphs/{GRAPH}/sims/S1/events"));
        assert_eq!(
            request.query.get("filter").map(String::as_str),
            Some("only-enabled")
        );
    }

    #[tokio::test]
    async fn test_enabled_events_bare_xml_body() {
        let api = MockDcrApi::start().await;
        let events = api
            .backend()
            .get_enabled_events(GRAPH, "bare", &MockDcrApi::credentials())
            .await
            .unwrap();
        assert_eq!(events.events.len(), 2);
    }

    #[tokio::test]
    async fn test_execute_event_bodies() {
        let api = MockDcrApi::start().await;
        let backend = api.backend();
        let credentials = MockDcrApi::credentials();

        backend
            .execute_event(GRAPH, "S1", "Ship", None, &credentials)
            .await
            .unwrap();
        let plain = api.last_request();
        assert_eq!(plain.path, format!("/api/graphs/{GRAPH}/sims/S1/events/Ship"));
        assert!(plain.body.is_empty());

        backend
            .execute_event(GRAPH, "S1", "Pay", Some("250"), &credentials)
            .await
            .unwrap();
        let valued = api.last_request();
        assert_eq!(valued.content_type.as_deref(), Some("application/xml"));
        assert!(valued.body.starts_with("<globalStore>"));
        assert!(valued.body.contains(r#"<variable id="Pay" value="250""#));
    }

    #[tokio::test]
    async fn test_execute_value_event_reads_global_store() {
        let api = MockDcrApi::start().await;

        let store = api
            .backend()
            .execute_value_event(GRAPH, "S1", "Pay", "0", &MockDcrApi::credentials())
            .await
            .unwrap();
        assert_eq!(store.get("amount").map(String::as_str), Some("250"));

        let requests = api.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, Method::POST);
        assert!(requests[0].body.contains(r#"value="0""#));
        assert_eq!(requests[1].method, Method::GET);
        assert_eq!(requests[1].path, format!("/api/graphs/{GRAPH}/sims/S1"));
    }

    #[tokio::test]
    async fn test_terminate_and_log() {
        let api = MockDcrApi::start().await;
        let backend = api.backend();
        let credentials = MockDcrApi::credentials();

        let log = backend.get_log(GRAPH, "S1", &credentials).await.unwrap();
        let ids: Vec<_> = log.iter().map(|e| (e.id, e.event_id.as_str())).collect();
        assert_eq!(ids, [(1, "Pay"), (2, "Ship")]);
        assert!(log.iter().all(|e| e.kind == "ExecuteEvent"));

        backend.terminate(GRAPH, "S1", &credentials).await.unwrap();
        let request = api.last_request();
        assert_eq!(request.method, Method::DELETE);
        assert_eq!(request.path, format!("/api/graphs/{GRAPH}/sims/S1"));
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_wrong_credentials_is_401() {
        let api = MockDcrApi::start().await;
        let err = api
            .backend()
            .start_simulation(GRAPH, &Credentials::new("alice", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_status_errors_carry_body() {
        let api = MockDcrApi::start().await;
        let backend = api.backend();
        let credentials = MockDcrApi::credentials();

        match backend.start_simulation("missing", &credentials).await {
            Err(BackendError::Status { status, body }) => {
                assert_eq!(status, 404);
                assert_eq!(body, "graph not found");
            }
            other => panic!("expected 404, got {other:?}"),
        }

        let err = backend.terminate(GRAPH, "ended", &credentials).await.unwrap_err();
        assert_eq!(err.remote_code(), RemoteErrorCode::BackendStatus);
    }

    #[tokio::test]
    async fn test_missing_simulation_id_header() {
        let api = MockDcrApi::start().await;
        let err = api
            .backend()
            .start_simulation("noheader", &MockDcrApi::credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MissingSimulationId));
        assert_eq!(err.remote_code(), RemoteErrorCode::BackendProtocol);
    }

    #[tokio::test]
    async fn test_unreachable_backend() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let backend = DcrHttpBackend::new(&BackendConfig {
            base_url: format!("http://{addr}/"),
            connect_timeout: Duration::from_secs(1),
            ..BackendConfig::default()
        })
        .unwrap();

        let err = backend
            .start_simulation(GRAPH, &MockDcrApi::credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Http(_)));
        assert_eq!(err.remote_code(), RemoteErrorCode::BackendUnavailable);
    }

    // =========================================================================
    // THROUGH THE BUS
    // =========================================================================

    #[tokio::test]
    async fn test_client_to_http_backend() {
        let api = MockDcrApi::start().await;
        let bus = Arc::new(InMemoryMessageBus::new());
        let dispatcher = DispatcherService::start(
            bus.clone(),
            Arc::new(api.backend()),
            DispatcherConfig::default(),
        )
        .await
        .unwrap();

        let config = RequesterConfig {
            client_id: generate_client_id(),
            credentials: MockDcrApi::credentials(),
            ..RequesterConfig::default()
        };
        let client = DcrClient::connect(bus.clone(), config).await.unwrap();

        let sim = client.start_simulation(GRAPH).await.unwrap();
        assert_eq!(sim, MOCK_SIM_ID);
        let events = client.get_enabled_events(GRAPH, &sim).await.unwrap();
        assert_eq!(events.pending().count(), 1);
        let store = client
            .execute_value_event(GRAPH, &sim, "Pay", "0")
            .await
            .unwrap();
        assert_eq!(store.get("amount").map(String::as_str), Some("250"));
        client.terminate(GRAPH, &sim).await.unwrap();

        match client.terminate(GRAPH, "ended").await {
            Err(CallError::Remote { error, .. }) => {
                assert_eq!(error.code, RemoteErrorCode::BackendStatus);
                assert!(error.message.contains("404"));
            }
            other => panic!("expected remote error, got {other:?}"),
        }

        client.shutdown().await;
        dispatcher.shutdown().await;
    }
}
