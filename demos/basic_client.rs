use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use serde_json::json;
use tracing_log_shipper::env::config_from_env;
use tracing_log_shipper::reqwest_transport::ReqwestTransport;
use tracing_log_shipper::{LogClient, LogLevel};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // LOG_SHIPPER_SERVER_URL, LOG_SHIPPER_API_KEY, ... override the defaults.
    let config = config_from_env()?.with_batching(50, Duration::from_secs(2));
    let transport = std::sync::Arc::new(ReqwestTransport::from_config(&config)?);
    let client = LogClient::new("auth-service", config, transport)?;

    let mut context = BTreeMap::new();
    context.insert("env".to_string(), json!("dev"));
    context.insert("host".to_string(), json!("local"));
    client.set_context(context);

    client.info("starting service").await;

    let mut data = BTreeMap::new();
    data.insert("user_id".to_string(), json!(42));
    data.insert("reason".to_string(), json!("invalid password"));
    client.warning_with("authentication failed", data).await;

    let err = io::Error::new(io::ErrorKind::ConnectionRefused, "session store unreachable");
    client.error_with_exception("could not persist session", &err, None).await;

    client
        .log_serializable(LogLevel::Debug, "config loaded", &json!({ "workers": 4 }))
        .await;

    client.flush().await;
    client.close().await;
    println!("{:?}", client.stats());
    Ok(())
}
