use crate::layer::ElasticLayer;
use crate::sink::ElasticSink;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the shipping layer.
///
/// Controls the internal channel size, the batch size handed to
/// [`ElasticSink::submit_batch`], how often a partial batch is flushed,
/// and whether events are additionally echoed to the console via a
/// `fmt` layer.
///
/// **Fields**
/// - `channel_buffer`: maximum queued [`crate::record::LogEvent`]s before
///   new events are dropped.
/// - `batch_size`: number of events per bulk submission.
/// - `flush_interval`: maximum interval between flushes even when the
///   batch is not full.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`ElasticLayer`].
/// - `min_level`: most verbose level the layer ships.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub min_level: Level,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: true,
            min_level: Level::INFO,
        }
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: the [`ElasticSink`] that will receive batched events.
/// - `config`: [`LayerConfig`] controlling buffering and batching.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`ElasticLayer`] as the global
/// default subscriber, so all `tracing` events in the process are observed
/// by the layer.
pub fn init_tracing_with_config(sink: Arc<ElasticSink>, config: LayerConfig) {
    let (layer, _handle) = ElasticLayer::new(
        sink,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
        config.min_level,
    );

    // The subscriber is assembled in two variants for type compatibility.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`]. This is the recommended entrypoint for
/// typical services.
pub fn init_tracing(sink: Arc<ElasticSink>) {
    init_tracing_with_config(sink, LayerConfig::default());
}
