use std::sync::Arc;

use tracing::{error, info};

use elastic_log_sink::config::{ElasticConfig, FieldConfig, FieldKind};
use elastic_log_sink::env;
use elastic_log_sink::init::init_tracing;
use elastic_log_sink::sink::ElasticSink;
use elastic_log_sink::template;

#[tokio::main]
async fn main() {
    // Node list from the environment, e.g. "http://localhost:9200" or a
    // comma-separated cluster.
    let mut config = ElasticConfig::default();
    config.uri = env::env_or(env::ELASTIC_URI_ENV, "http://localhost:9200");
    config.include_all_properties = true;
    config.fields = vec![FieldConfig::new(
        "service",
        template::text("example-service"),
        FieldKind::String,
    )];

    let sink = Arc::new(ElasticSink::new(config).expect("failed to build elasticsearch sink"));
    init_tracing(sink);

    info!("elasticsearch sink example started");
    error!(order_id = 42u64, "simulated error shipped to elasticsearch");

    // Let the background task flush before the process exits.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
}
