use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::error;

use elastic_log_sink::config::ElasticConfig;
use elastic_log_sink::init::{init_tracing_with_config, LayerConfig};
use elastic_log_sink::noop::NoopTransport;
use elastic_log_sink::sink::ElasticSink;

#[tokio::main]
async fn main() {
    let sink = Arc::new(ElasticSink::with_transport(
        ElasticConfig::default(),
        Arc::new(NoopTransport),
    ));
    let config = LayerConfig { enable_stdout: false, ..LayerConfig::default() };
    init_tracing_with_config(sink, config);

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "bulk load test error");
    }

    let elapsed = start.elapsed();
    println!(
        "noop transport: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Give the background task a little time to drain the channel
    sleep(Duration::from_secs(2)).await;
}
