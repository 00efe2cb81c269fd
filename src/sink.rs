use std::sync::Arc;
use tracing::{error, trace};

use crate::bulk::{self, BatchRequest, BulkDocument};
use crate::config::{self, ElasticConfig};
use crate::document::DocumentBuilder;
use crate::env;
use crate::error::{SinkError, NO_ERROR_MESSAGE};
use crate::index::IndexResolver;
use crate::record::LogEvent;
use crate::transport::{BulkPayload, HttpTransport, Outcome, Transport};

/// Batching Elasticsearch sink.
///
/// Owns the end-to-end submit: resolve index and document per event,
/// encode the whole batch once, make one transport call, then fan the
/// outcome back out through every event's completion callback. The sink
/// holds no locks and no mutable state, so disjoint batches may be
/// submitted concurrently; the only shared resource is the transport's
/// connection pool.
pub struct ElasticSink {
    resolver: IndexResolver,
    builder: DocumentBuilder,
    transport: Arc<dyn Transport>,
    structured: bool,
    pre_serialized_messages: bool,
    rethrow_on_failure: bool,
}

impl ElasticSink {
    /// Build a sink with an HTTP transport from the configuration.
    ///
    /// The node list comes from the named connection string (environment
    /// lookup) when configured, falling back to `uri`.
    pub fn new(config: ElasticConfig) -> Result<Self, SinkError> {
        let uri = config
            .connection_string_name
            .as_deref()
            .and_then(env::connection_string)
            .unwrap_or_else(|| config.uri.clone());
        let nodes = config::split_nodes(&uri);
        let transport = HttpTransport::new(&config, nodes)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Build a sink over a caller-provided transport. This is the seam
    /// used by tests and by hosts with their own HTTP stack.
    pub fn with_transport(config: ElasticConfig, transport: Arc<dyn Transport>) -> Self {
        ElasticSink {
            resolver: IndexResolver::new(config.index.clone(), config.document_type.clone()),
            builder: DocumentBuilder::new(
                config.fields.clone(),
                config.include_all_properties,
                config.excluded_properties.clone(),
            ),
            structured: config.serializer.is_some(),
            pre_serialized_messages: config.pre_serialized_messages,
            rethrow_on_failure: config.rethrow_on_failure,
            transport,
        }
    }

    /// Whether the host's failure-reporting policy should rethrow. The
    /// sink itself never consults this; callback propagation happens
    /// regardless.
    pub fn rethrow_on_failure(&self) -> bool {
        self.rethrow_on_failure
    }

    /// Submit one event; the batch-of-one case, no separate path.
    pub async fn submit(&self, event: LogEvent) {
        self.submit_batch(vec![event]).await;
    }

    /// Submit a batch and resolve every completion before returning.
    ///
    /// On success each callback fires with `None`, in input order. On any
    /// failure — transport non-success, native transport error, or a
    /// document that failed to build — every callback in the batch fires
    /// with the same shared error; no per-document distinction is made,
    /// since the bulk response is not parsed per item.
    pub async fn submit_batch(&self, events: Vec<LogEvent>) {
        if events.is_empty() {
            return;
        }

        match self.dispatch(&events).await {
            Ok(()) => {
                for event in events {
                    event.complete(None);
                }
            }
            Err(failure) => {
                self.log_failure(&failure);
                let failure = Arc::new(failure);
                for event in events {
                    event.complete(Some(Arc::clone(&failure)));
                }
            }
        }
    }

    async fn dispatch(&self, events: &[LogEvent]) -> Result<(), SinkError> {
        let mut batch = BatchRequest::with_capacity(events.len());
        for event in events {
            let action = self.resolver.resolve(event);
            let document = if self.pre_serialized_messages {
                BulkDocument::Raw(event.message.clone())
            } else {
                BulkDocument::Built(self.builder.build(event)?)
            };
            batch.push(action, document);
        }

        let payload = if self.structured {
            BulkPayload::Structured(bulk::encode_structured(&batch)?)
        } else {
            BulkPayload::Lines(bulk::encode_lines(&batch)?)
        };

        match self.transport.send(payload).await {
            Outcome::Success => Ok(()),
            Outcome::Failure(failure) => {
                if let Some(native) = failure.error {
                    Err(SinkError::TransportError(native))
                } else {
                    Err(SinkError::TransportFailure {
                        status: failure.status.unwrap_or_default(),
                        message: failure
                            .message
                            .unwrap_or_else(|| NO_ERROR_MESSAGE.to_string()),
                    })
                }
            }
        }
    }

    // One short error line plus one trace line with the full detail.
    fn log_failure(&self, failure: &SinkError) {
        match failure {
            SinkError::TransportFailure { status, message } => {
                error!(
                    "elasticsearch: failed to ship log batch. status={status}, message=\"{message}\""
                );
            }
            SinkError::TransportError(native) => {
                if native.is_aggregate() {
                    error!("elasticsearch: error while shipping log batch: {native}");
                } else {
                    // A lone cause is logged directly instead of as a group.
                    let cause = &native.causes()[0];
                    error!("elasticsearch: error while shipping log batch: {cause}");
                }
            }
            SinkError::BuildFailure { reason } => {
                error!("elasticsearch: failed to build log batch: {reason}");
            }
        }
        trace!("elasticsearch: batch dispatch failed. result={failure:?}");
    }
}
