//! # Dispatcher Flows
//!
//! Raw request messages published straight onto the bus, bypassing the
//! requester, to check how the dispatcher pool treats them.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dcr_02_dispatcher::DispatcherConfig;
    use shared_bus::{BusMessage, MessageBus, Subscription};
    use shared_types::{
        Credentials, Operation, StartSimulationResponse, STATUS_ERROR, STATUS_PROPERTY,
    };
    use tokio::time::timeout;

    use crate::fixtures::{credentials, GraphScript, Harness, ScriptedBackend};

    const REPLY_TOPIC: &str = "DCR/StartSimulation/raw-client";

    fn backend() -> ScriptedBackend {
        ScriptedBackend::new().with_graph("G1", GraphScript::new())
    }

    fn start_request(correlation: u8, payload: &str) -> BusMessage {
        BusMessage::new(Operation::StartSimulation.request_topic("DCR"), payload.to_string())
            .with_correlation_data(vec![correlation; 16])
            .with_response_topic(REPLY_TOPIC)
            .with_user_properties(credentials().to_properties())
    }

    async fn expect_reply(replies: &mut Subscription) -> BusMessage {
        timeout(Duration::from_secs(2), replies.recv())
            .await
            .expect("reply within deadline")
            .expect("subscription open")
    }

    async fn expect_silence(replies: &mut Subscription) {
        assert!(
            timeout(Duration::from_millis(200), replies.recv())
                .await
                .is_err(),
            "no reply expected"
        );
    }

    #[tokio::test]
    async fn test_reply_echoes_correlation_data() {
        let harness = Harness::start(backend(), 1).await;
        let mut replies = harness.bus.subscribe(REPLY_TOPIC).await.unwrap();

        harness
            .bus
            .publish(start_request(9, r#"{"graph_id":"G1"}"#))
            .await
            .unwrap();

        let reply = expect_reply(&mut replies).await;
        assert_eq!(reply.correlation_data, Some(vec![9; 16]));
        assert_eq!(reply.topic, REPLY_TOPIC);
        let body: StartSimulationResponse = serde_json::from_slice(&reply.payload).unwrap();
        assert_eq!(body.sim_id, "G1-1");

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_request_dropped_and_dispatcher_survives() {
        let harness = Harness::start(backend(), 1).await;
        let mut replies = harness.bus.subscribe(REPLY_TOPIC).await.unwrap();

        harness
            .bus
            .publish(start_request(1, "{not json"))
            .await
            .unwrap();
        harness
            .bus
            .publish(start_request(2, r#"{"graph":"G1"}"#))
            .await
            .unwrap();
        harness
            .bus
            .publish(start_request(3, r#"{"graph_id":"G1"}"#))
            .await
            .unwrap();

        // Only the well-formed request is answered
        let reply = expect_reply(&mut replies).await;
        assert_eq!(reply.correlation_data, Some(vec![3; 16]));
        expect_silence(&mut replies).await;

        assert_eq!(harness.dropped(), 2);
        assert_eq!(harness.backend.count_calls("start"), 1);

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_without_metadata_dropped() {
        let harness = Harness::start(backend(), 1).await;
        let mut replies = harness.bus.subscribe(REPLY_TOPIC).await.unwrap();

        let mut no_credentials = start_request(1, r#"{"graph_id":"G1"}"#);
        no_credentials.user_properties.clear();
        let mut no_reply_topic = start_request(2, r#"{"graph_id":"G1"}"#);
        no_reply_topic.response_topic = None;
        let mut no_correlation = start_request(3, r#"{"graph_id":"G1"}"#);
        no_correlation.correlation_data = None;

        for message in [no_credentials, no_reply_topic, no_correlation] {
            harness.bus.publish(message).await.unwrap();
        }

        expect_silence(&mut replies).await;
        assert_eq!(harness.received(), 3);
        assert_eq!(harness.dropped(), 3);
        assert!(harness.backend.calls().is_empty());

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_wrong_credentials_error_reply() {
        let harness = Harness::start(backend(), 1).await;
        let mut replies = harness.bus.subscribe(REPLY_TOPIC).await.unwrap();

        let request = BusMessage::new("DCR/StartSimulation", r#"{"graph_id":"G1"}"#)
            .with_correlation_data(vec![5; 16])
            .with_response_topic(REPLY_TOPIC)
            .with_user_properties(Credentials::new("mallory", "guess").to_properties());
        harness.bus.publish(request).await.unwrap();

        let reply = expect_reply(&mut replies).await;
        assert_eq!(reply.user_property(STATUS_PROPERTY), Some(STATUS_ERROR));
        assert!(String::from_utf8_lossy(&reply.payload).contains("401"));

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_share_group_delivers_each_request_once() {
        let harness = Harness::start(backend(), 3).await;
        let mut replies = harness.bus.subscribe(REPLY_TOPIC).await.unwrap();

        for n in 0..30u8 {
            harness
                .bus
                .publish(start_request(n, r#"{"graph_id":"G1"}"#))
                .await
                .unwrap();
        }

        let mut correlations = Vec::new();
        for _ in 0..30 {
            correlations.push(expect_reply(&mut replies).await.correlation_data.unwrap()[0]);
        }
        expect_silence(&mut replies).await;

        correlations.sort_unstable();
        assert_eq!(correlations, (0..30).collect::<Vec<u8>>());
        assert_eq!(harness.backend.count_calls("start"), 30);
        for dispatcher in &harness.dispatchers {
            assert_eq!(dispatcher.stats().received, 10);
        }

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_dedup_window_drops_redelivery() {
        let config = DispatcherConfig {
            dedup_window: Some(Duration::from_secs(60)),
            ..DispatcherConfig::default()
        };
        let harness = Harness::with_config(backend(), 1, config).await;
        let mut replies = harness.bus.subscribe(REPLY_TOPIC).await.unwrap();

        for _ in 0..2 {
            harness
                .bus
                .publish(start_request(7, r#"{"graph_id":"G1"}"#))
                .await
                .unwrap();
        }

        expect_reply(&mut replies).await;
        expect_silence(&mut replies).await;
        assert_eq!(harness.backend.count_calls("start"), 1);
        assert_eq!(harness.dropped(), 1);

        harness.shutdown().await;
    }

    #[tokio::test]
    async fn test_custom_prefix_and_group() {
        let config = DispatcherConfig {
            share_group: "workers".into(),
            topic_prefix: "bridge/dcr".into(),
            ..DispatcherConfig::default()
        };
        let harness = Harness::with_config(backend(), 1, config).await;
        let mut replies = harness.bus.subscribe("bridge/dcr/StartSimulation/c").await.unwrap();

        let request = BusMessage::new("bridge/dcr/StartSimulation", r#"{"graph_id":"G1"}"#)
            .with_correlation_data(vec![1])
            .with_response_topic("bridge/dcr/StartSimulation/c")
            .with_user_properties(credentials().to_properties());
        harness.bus.publish(request).await.unwrap();
        expect_reply(&mut replies).await;

        // The default prefix is not served
        let delivered = harness
            .bus
            .publish(start_request(2, r#"{"graph_id":"G1"}"#))
            .await
            .unwrap();
        assert_eq!(delivered, 0);

        harness.shutdown().await;
    }
}
