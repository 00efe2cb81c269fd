use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::document::FieldValue;
use crate::record::LogEvent;
use crate::sink::ElasticSink;

/// `tracing_subscriber` layer that turns events into [`LogEvent`]s and
/// forwards them to an [`ElasticSink`] via a bounded channel and a
/// background batching task.
///
/// The channel decouples network I/O from application threads; when it is
/// full, new events are dropped and counted rather than blocking the
/// caller. Delivery outcomes come back through each event's completion
/// callback and feed the delivered/failed counters.
pub struct ElasticLayer {
    sender: mpsc::Sender<LogEvent>,
    min_level: Level,
    /// Total events seen by the layer (before level filtering).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into the channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Completed with no error.
    pub delivered_events: Arc<AtomicU64>,
    /// Completed with a delivery failure.
    pub failed_events: Arc<AtomicU64>,
}

impl ElasticLayer {
    /// Create a new layer and spawn the background task that drains the
    /// channel and submits batches to the sink.
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations. Batches are
    /// submitted once; retry on failure is the host's decision, driven by
    /// the failure counters and completion callbacks.
    pub fn new(
        sink: Arc<ElasticSink>,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
        min_level: Level,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<LogEvent>(buffer);

        let total_events = Arc::new(AtomicU64::new(0));
        let enqueued_events = Arc::new(AtomicU64::new(0));
        let dropped_events = Arc::new(AtomicU64::new(0));
        let delivered_events = Arc::new(AtomicU64::new(0));
        let failed_events = Arc::new(AtomicU64::new(0));

        let handle = tokio::spawn(async move {
            let mut batch: Vec<LogEvent> = Vec::with_capacity(batch_size);

            loop {
                tokio::select! {
                    received = rx.recv() => {
                        match received {
                            Some(event) => {
                                batch.push(event);
                                if batch.len() >= batch_size {
                                    sink.submit_batch(std::mem::take(&mut batch)).await;
                                }
                            }
                            // Channel closed: flush the tail and stop.
                            None => {
                                if !batch.is_empty() {
                                    sink.submit_batch(std::mem::take(&mut batch)).await;
                                }
                                break;
                            }
                        }
                    }
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            sink.submit_batch(std::mem::take(&mut batch)).await;
                        }
                    }
                }
            }
        });

        (
            Self {
                sender: tx,
                min_level,
                total_events,
                enqueued_events,
                dropped_events,
                delivered_events,
                failed_events,
            },
            handle,
        )
    }
}

impl<S> Layer<S> for ElasticLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // The sink logs its own delivery failures through `tracing`;
        // shipping those would feed the failure back into the channel.
        if meta.target().starts_with("elastic_log_sink") {
            return;
        }

        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *meta.level() > self.min_level {
            return;
        }

        let mut properties = Vec::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor { properties: &mut properties, message: &mut message };
        event.record(&mut visitor);

        let delivered = Arc::clone(&self.delivered_events);
        let failed = Arc::clone(&self.failed_events);
        let mut log_event = LogEvent::new(meta.level().to_string(), message.unwrap_or_default())
            .on_completion(move |outcome| {
                if outcome.is_none() {
                    delivered.fetch_add(1, Ordering::Relaxed);
                } else {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            });
        for (key, value) in properties {
            log_event = log_event.with_property(key, value);
        }
        log_event = log_event.with_property("target", meta.target());
        if let Some(module_path) = meta.module_path() {
            log_event = log_event.with_property("module_path", module_path);
        }
        if let Some(file) = meta.file() {
            log_event = log_event.with_property("file", file);
        }
        if let Some(line) = meta.line() {
            log_event = log_event.with_property("line", line as u64);
        }

        if self.sender.try_send(log_event).is_err() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            eprintln!("log channel full, dropping log event");
        } else {
            self.enqueued_events.fetch_add(1, Ordering::Relaxed);
        }
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub properties: &'a mut Vec<(String, FieldValue)>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.properties
                .push((field.name().to_string(), FieldValue::String(value.to_string())));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.properties.push((field.name().to_string(), value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.properties.push((field.name().to_string(), value.into()));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.properties.push((field.name().to_string(), value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.properties.push((field.name().to_string(), value.into()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.properties.push((
                field.name().to_string(),
                FieldValue::String(format!("{:?}", value)),
            ));
        }
    }
}
