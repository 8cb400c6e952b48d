mod common;

use common::{body_json, RecordingTransport};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing_log_shipper::adapter::event::{EventLevel, EventSink, StructuredEvent};
use tracing_log_shipper::layer::ShipperLayer;
use tracing_log_shipper::{ClientConfig, ExceptionInfo, LogClient};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

fn queued_client(transport: &std::sync::Arc<RecordingTransport>) -> LogClient {
    let config = ClientConfig::new("http://logs.test").with_batching(100, Duration::ZERO);
    LogClient::new("adapters", config, transport.clone()).unwrap()
}

async fn flushed_records(client: &LogClient, transport: &RecordingTransport) -> Vec<Value> {
    client.flush().await;
    transport
        .requests()
        .iter()
        .flat_map(|r| body_json(r).as_array().cloned().unwrap_or_default())
        .collect()
}

#[derive(Debug)]
struct Refused;

impl std::fmt::Display for Refused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection refused")
    }
}

impl std::error::Error for Refused {}

#[tokio::test]
async fn tracing_events_become_records() {
    let transport = RecordingTransport::new();
    let client = queued_client(&transport);
    let layer = ShipperLayer::new(client.clone()).with_max_level(tracing::Level::INFO);
    let forwarded = layer.forwarded_events.clone();
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        let outer = tracing::info_span!("request", request_id = "r-1", user = "outer");
        let _outer = outer.enter();
        let inner = tracing::info_span!("handler", user = "inner");
        let _inner = inner.enter();

        tracing::debug!("filtered out");
        tracing::info!(order = 42, "order placed");
        let err = Refused;
        tracing::error!(error = &err as &(dyn std::error::Error + 'static), "upstream failed");
    });

    assert_eq!(forwarded.load(Ordering::Relaxed), 2);
    let records = flushed_records(&client, &transport).await;
    assert_eq!(records.len(), 2);

    let placed = &records[0];
    assert_eq!(placed["level"], "Info");
    assert_eq!(placed["message"], "order placed");
    assert_eq!(placed["data"]["order"], 42);
    assert_eq!(placed["data"]["request_id"], "r-1");
    assert_eq!(placed["data"]["user"], "inner");
    assert_eq!(placed["data"]["category"], "adapters");

    let failed = &records[1];
    assert_eq!(failed["level"], "Error");
    assert_eq!(failed["exception"]["message"], "connection refused");
}

#[tokio::test]
async fn layer_ignores_configured_targets() {
    let transport = RecordingTransport::new();
    let client = queued_client(&transport);
    let layer = ShipperLayer::new(client.clone()).ignore_target("noisy");
    let subscriber = Registry::default().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "noisy::pool", "checked out");
        tracing::info!(target: "hyper::client", "connecting");
        tracing::info!("kept");
    });

    let records = flushed_records(&client, &transport).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["message"], "kept");
}

#[tokio::test]
async fn similarly_named_application_targets_are_shipped() {
    let transport = RecordingTransport::new();
    let client = queued_client(&transport);
    let subscriber = Registry::default().with(ShipperLayer::new(client.clone()));

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(target: "hyperion_api", "search served");
        tracing::info!(target: "h2o_billing::invoice", "invoice issued");
        tracing::info!(target: "tracing_log_shipper_demo", "demo started");
        tracing::info!(target: "hyper::client", "connecting");
    });

    let records = flushed_records(&client, &transport).await;
    let categories: Vec<&str> = records.iter().map(|r| r["data"]["category"].as_str().unwrap()).collect();
    assert_eq!(categories, vec!["hyperion_api", "h2o_billing::invoice", "tracing_log_shipper_demo"]);
}

#[tokio::test]
async fn structured_events_are_rendered() {
    let transport = RecordingTransport::new();
    let client = queued_client(&transport);
    let sink = EventSink::new(client.clone());

    sink.emit(
        StructuredEvent::new(EventLevel::Verbose, "User {UserId} bought {Count} items")
            .with_property("UserId", "u-9")
            .with_property("Count", 3_i64)
            .with_property("@internal", "hidden"),
    );
    sink.emit_async(
        StructuredEvent::new(EventLevel::Fatal, "Crashed")
            .with_exception(ExceptionInfo::new("Panic", "index out of bounds")),
    )
    .await;

    let records = flushed_records(&client, &transport).await;
    assert_eq!(records.len(), 2);

    let bought = &records[0];
    assert_eq!(bought["level"], "Debug");
    assert_eq!(bought["message"], "User u-9 bought 3 items");
    assert_eq!(bought["data"]["messageTemplate"], "User {UserId} bought {Count} items");
    assert_eq!(bought["data"]["UserId"], "u-9");
    assert_eq!(bought["data"]["Count"], json!(3));
    assert!(bought["data"].get("@internal").is_none());
    assert!(bought["data"]["timestamp"].is_string());

    let crashed = &records[1];
    assert_eq!(crashed["level"], "Fatal");
    assert_eq!(crashed["exception"]["type"], "Panic");
}

#[cfg(feature = "slog")]
mod slog_drain {
    use super::*;
    use slog::{o, Logger};
    use tracing_log_shipper::adapter::slog::ShipperDrain;

    #[tokio::test]
    async fn slog_records_carry_scope_and_fields() {
        let transport = RecordingTransport::new();
        let client = queued_client(&transport);
        let root = Logger::root(ShipperDrain::new(client.clone()), o!("service" => "billing", "region" => "eu"));
        let child = root.new(o!("region" => "us"));

        slog::info!(child, "invoice sent"; "invoice" => 17, "service" => "override");
        slog::crit!(child, "ledger corrupt");

        let records = flushed_records(&client, &transport).await;
        assert_eq!(records.len(), 2);

        let sent = &records[0];
        assert_eq!(sent["level"], "Info");
        assert_eq!(sent["message"], "invoice sent");
        assert_eq!(sent["data"]["invoice"], 17);
        assert_eq!(sent["data"]["region"], "us");
        assert_eq!(sent["data"]["service"], "override");
        assert!(sent["data"]["eventId"].as_str().unwrap().starts_with("tests"));

        assert_eq!(records[1]["level"], "Fatal");
    }
}
