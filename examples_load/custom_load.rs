use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;
use tracing::{error, Level};

use tracing_log_shipper::init::{init_tracing_with_config, LayerConfig};
use tracing_log_shipper::noop_transport::NoopTransport;
use tracing_log_shipper::{ClientConfig, CloseBehavior, LogClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::default()
        .with_batching(1_000, Duration::from_millis(200))
        .with_max_pending(50_000)
        .with_close_behavior(CloseBehavior::Drain);
    let client = LogClient::new("load", config, Arc::new(NoopTransport))?;

    let layer_config = LayerConfig {
        max_level: Level::ERROR,
        enable_stdout: false,
    };
    init_tracing_with_config(client.clone(), layer_config)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: logged {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    client.close().await;
    let stats = client.stats();
    println!("sent {} in {} batches, dropped {}", stats.sent, stats.batches, stats.dropped);
    Ok(())
}
