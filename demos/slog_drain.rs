use std::sync::Arc;
use std::time::Duration;

use slog::{o, Logger};
use tracing_log_shipper::adapter::slog::ShipperDrain;
use tracing_log_shipper::reqwest_transport::ReqwestTransport;
use tracing_log_shipper::{ClientConfig, LogClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("http://127.0.0.1:3030").with_batching(100, Duration::from_secs(1));
    let transport = Arc::new(ReqwestTransport::from_config(&config)?);
    let client = LogClient::new("ftp-gateway", config, transport)?;

    let root = Logger::root(ShipperDrain::new(client.clone()), o!("service" => "ftp-gateway"));
    let session = root.new(o!("session" => "s-19", "peer" => "10.0.0.5"));

    slog::info!(session, "user logged in"; "user" => "alice");
    slog::warn!(session, "quota nearly exhausted"; "used_pct" => 93);
    slog::crit!(root, "storage backend offline");

    client.flush().await;
    client.close().await;
    Ok(())
}
