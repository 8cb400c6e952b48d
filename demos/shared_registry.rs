use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::json;
use tracing_log_shipper::{ClientConfig, ClientRegistry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("http://127.0.0.1:3030")
        .with_namespace("shop")
        .with_batching(20, Duration::from_secs(1));
    let registry = ClientRegistry::with_reqwest(config)?;

    let mut global = BTreeMap::new();
    global.insert("region".to_string(), json!("eu-west-1"));
    registry.set_global_context(global);

    let orders = registry.get_or_create("orders")?;
    let payments = registry.get_or_create("payments")?;

    orders.info("order placed").await;
    payments.info("payment captured").await;

    // Same name, same client.
    registry.get_or_create("orders")?.info("order shipped").await;

    println!("clients: {:?}", registry.names());
    registry.flush_all().await;
    let discarded = registry.reset().await;
    println!("discarded on shutdown: {}", discarded);
    Ok(())
}
