use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::time::{sleep, Duration};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elastic_log_sink::config::ElasticConfig;
use elastic_log_sink::layer::ElasticLayer;
use elastic_log_sink::sink::ElasticSink;

#[tokio::test]
async fn layer_ships_events_through_the_channel() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut config = ElasticConfig::default();
    config.uri = server.uri();
    config.include_all_properties = true;
    let sink = Arc::new(ElasticSink::new(config).expect("build sink"));

    let (layer, _handle) =
        ElasticLayer::new(sink, 64, 1, Duration::from_millis(20), Level::INFO);
    let total = Arc::clone(&layer.total_events);
    let delivered = Arc::clone(&layer.delivered_events);
    let dropped = Arc::clone(&layer.dropped_events);

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!(user = "ada", "first shipped event");
        tracing::warn!("second shipped event");
        tracing::trace!("below the configured level");
    });

    for _ in 0..250 {
        if delivered.load(Ordering::SeqCst) >= 2 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(total.load(Ordering::SeqCst), 3);
    assert_eq!(delivered.load(Ordering::SeqCst), 2);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);

    let requests = server.received_requests().await.unwrap();
    let bodies: String = requests
        .iter()
        .map(|r| String::from_utf8(r.body.clone()).unwrap())
        .collect();
    assert!(bodies.contains("first shipped event"));
    assert!(bodies.contains("second shipped event"));
    assert!(bodies.contains(r#""user":"ada""#));
    assert!(!bodies.contains("below the configured level"));
}

#[tokio::test]
async fn delivery_failures_feed_the_failed_counter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = ElasticConfig::default();
    config.uri = server.uri();
    let sink = Arc::new(ElasticSink::new(config).expect("build sink"));

    let (layer, _handle) =
        ElasticLayer::new(sink, 64, 1, Duration::from_millis(20), Level::INFO);
    let failed = Arc::clone(&layer.failed_events);

    let subscriber = Registry::default().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::error!("doomed event");
    });

    for _ in 0..250 {
        if failed.load(Ordering::SeqCst) >= 1 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(failed.load(Ordering::SeqCst), 1);
}
