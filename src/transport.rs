use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::sync::Arc;

use crate::config::ElasticConfig;
use crate::error::TransportError;

/// Wire payload produced by the encoder.
///
/// `Lines` is the default: documents already rendered to newline-delimited
/// JSON. `Structured` carries the raw alternating units and is used when a
/// custom serializer decides how documents become bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkPayload {
    Lines(String),
    Structured(Vec<serde_json::Value>),
}

/// Result of one bulk call.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Failure(Failure),
}

/// Non-success outcome: a status code when the backend answered, a
/// best-effort response message, and/or the native error chain when the
/// call itself failed.
#[derive(Debug, Default)]
pub struct Failure {
    pub status: Option<u16>,
    pub message: Option<String>,
    pub error: Option<TransportError>,
}

/// Blocking call-and-outcome contract the dispatcher depends on.
///
/// Implementations transport one encoded batch to the backend and report
/// how it went; they never retry and never interpret per-item results.
/// The dispatcher awaits `send` for the full round trip, so any timeout
/// is the implementation's own configuration.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit one bulk payload.
    ///
    /// **Returns**
    /// - [`Outcome::Success`] if the backend accepted the batch.
    /// - [`Outcome::Failure`] with status and/or native error otherwise.
    async fn send(&self, payload: BulkPayload) -> Outcome;
}

/// Overrides how structured bulk units are rendered into wire text.
pub trait DocumentSerializer: Send + Sync {
    fn serialize(&self, unit: &serde_json::Value)
        -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// HTTP transport posting to `{node}/_bulk`.
///
/// The resolved node list acts as a static pool: nodes are tried in order,
/// connection-level errors move on to the next node, and an HTTP response
/// of any status is final. If every node fails to answer, the accumulated
/// causes surface as one aggregate [`TransportError`].
pub struct HttpTransport {
    client: Client,
    nodes: Vec<String>,
    auth: Option<(String, String)>,
    serializer: Option<Arc<dyn DocumentSerializer>>,
}

impl HttpTransport {
    /// Build the client from the sink configuration and the resolved node
    /// list, applying the proxy and certificate toggles.
    pub fn new(config: &ElasticConfig, nodes: Vec<String>) -> Result<Self, TransportError> {
        if nodes.is_empty() {
            return Err(TransportError::new("no elasticsearch nodes resolved"));
        }

        let mut builder = Client::builder();
        if config.disable_automatic_proxy_detection {
            builder = builder.no_proxy();
        }
        if config.danger_accept_all_certificates {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder.build().map_err(TransportError::new)?;

        let auth = if config.require_auth {
            Some((
                config.username.clone().unwrap_or_default(),
                config.password.clone().unwrap_or_default(),
            ))
        } else {
            None
        };

        Ok(HttpTransport {
            client,
            nodes,
            auth,
            serializer: config.serializer.clone(),
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    fn render(&self, units: &[serde_json::Value]) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut body = String::new();
        for unit in units {
            let line = match &self.serializer {
                Some(serializer) => serializer.serialize(unit)?,
                None => serde_json::to_string(unit)?,
            };
            body.push_str(line.trim_end());
            body.push('\n');
        }
        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: BulkPayload) -> Outcome {
        let body = match payload {
            BulkPayload::Lines(lines) => lines,
            BulkPayload::Structured(units) => match self.render(&units) {
                Ok(body) => body,
                Err(e) => {
                    return Outcome::Failure(Failure {
                        error: Some(TransportError::new(e)),
                        ..Failure::default()
                    })
                }
            },
        };

        let mut causes: Vec<Box<dyn Error + Send + Sync>> = Vec::new();
        for node in &self.nodes {
            let url = format!("{}/_bulk", node.trim_end_matches('/'));
            let mut request = self
                .client
                .post(&url)
                .header("Content-Type", "application/x-ndjson")
                .body(body.clone());
            if let Some((username, password)) = &self.auth {
                request = request.basic_auth(username, Some(password));
            }

            match request.send().await {
                Ok(resp) if resp.status().is_success() => return Outcome::Success,
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let message = resp.text().await.ok().filter(|text| !text.is_empty());
                    return Outcome::Failure(Failure {
                        status: Some(status),
                        message,
                        error: None,
                    });
                }
                // No response from this node; try the next one.
                Err(e) => causes.push(Box::new(e)),
            }
        }

        Outcome::Failure(Failure {
            error: Some(TransportError::aggregate(causes)),
            ..Failure::default()
        })
    }
}
