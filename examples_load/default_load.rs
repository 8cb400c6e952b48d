use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_log_shipper::init::init_tracing;
use tracing_log_shipper::noop_transport::NoopTransport;
use tracing_log_shipper::{ClientConfig, LogClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = LogClient::new("load", ClientConfig::default(), Arc::new(NoopTransport))?;
    init_tracing(client.clone())?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: logged {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Let the worker drain the queue before reporting.
    while client.pending() > 0 {
        client.flush().await;
    }
    println!("{:?}", client.stats());
    Ok(())
}
