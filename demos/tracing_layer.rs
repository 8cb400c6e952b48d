use std::sync::Arc;
use tokio::time::Duration;
use tracing::{error, info, info_span, warn};

use tracing_log_shipper::init::init_tracing;
use tracing_log_shipper::reqwest_transport::ReqwestTransport;
use tracing_log_shipper::{ClientConfig, LogClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("http://127.0.0.1:3030").with_batching(100, Duration::from_secs(1));
    let transport = Arc::new(ReqwestTransport::from_config(&config)?);
    let client = LogClient::new("auth-service", config, transport)?;
    init_tracing(client.clone())?;

    info!("starting service");

    let span = info_span!("login", request_id = "req-7f3a");
    {
        let _enter = span.enter();
        warn!(attempt = 3, "slow credential lookup");
        error!(user_id = 42, reason = "invalid password", "authentication failed");
    }

    client.flush().await;
    client.close().await;
    Ok(())
}
