// HTTP transport integration tests (feature-gated).

#[cfg(feature = "reqwest-transport")]
mod reqwest_transport {
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tracing_log_shipper::reqwest_transport::ReqwestTransport;
    use tracing_log_shipper::{ClientConfig, ClientRegistry, CloseBehavior, LogClient};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn batch_is_posted_to_the_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/team-a/logs/checkout/batch"))
            .and(header("x-api-key", "k-123"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri())
            .with_namespace("team-a")
            .with_api_key("k-123")
            .with_batching(10, Duration::ZERO)
            .with_close_behavior(CloseBehavior::Drain);
        let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
        let client = LogClient::new("checkout", config, transport).unwrap();

        client.info("cart created").await;
        client.warning("coupon expired").await;
        assert_eq!(client.close().await, 0);

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        let body: Value = serde_json::from_slice(&received[0].body).unwrap();
        let messages: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["message"].as_str().unwrap())
            .collect();
        assert_eq!(messages, vec!["cart created", "coupon expired"]);
        assert_eq!(client.stats().sent, 2);
    }

    #[tokio::test]
    async fn server_errors_are_counted_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs/checkout"))
            .respond_with(ResponseTemplate::new(500).set_body_string("ingest down"))
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri()).without_batching();
        let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
        let client = LogClient::new("checkout", config, transport).unwrap();

        client.error("payment declined").await;

        let stats = client.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.sent, 0);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_failed_send() {
        let config = ClientConfig::new("http://127.0.0.1:9")
            .without_batching()
            .with_request_timeout(Duration::from_secs(2));
        let transport = Arc::new(ReqwestTransport::from_config(&config).unwrap());
        let client = LogClient::new("checkout", config, transport).unwrap();

        client.info("nobody listening").await;
        assert_eq!(client.stats().failed, 1);
    }

    #[tokio::test]
    async fn registry_clients_share_one_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let registry = ClientRegistry::with_reqwest(ClientConfig::new(server.uri()).without_batching()).unwrap();
        registry.get_or_create("orders").unwrap().info("o").await;
        registry.get_or_create("payments").unwrap().info("p").await;

        let mut paths: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect();
        paths.sort();
        assert_eq!(paths, vec!["/logs/orders", "/logs/payments"]);
    }
}
