use std::sync::Arc;

use crate::template::{self, Template, TimestampedIndex};
use crate::transport::DocumentSerializer;

pub const DEFAULT_URI: &str = "http://localhost:9200";

/// Properties skipped by the dynamic property dump unless the exclusion
/// list is overridden. These are host-pipeline bookkeeping values that add
/// noise to every document.
pub const DEFAULT_EXCLUDED_PROPERTIES: [&str; 5] = [
    "CallerMemberName",
    "CallerFilePath",
    "CallerLineNumber",
    "MachineName",
    "ThreadId",
];

/// Target type an extra field is coerced into after rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Timestamp,
}

/// One additional document field: a name, a template rendered per event,
/// and the kind the rendered string is coerced into.
#[derive(Clone)]
pub struct FieldConfig {
    pub name: String,
    pub template: Template,
    pub kind: FieldKind,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, template: Template, kind: FieldKind) -> Self {
        FieldConfig { name: name.into(), template, kind }
    }
}

/// Sink configuration, consumed once at construction and immutable after.
#[derive(Clone)]
pub struct ElasticConfig {
    /// Name of an environment variable holding the node URI list; when set
    /// and non-empty it wins over `uri`. Resolution happens through
    /// [`crate::env::connection_string`], never inside the core pipeline.
    pub connection_string_name: Option<String>,
    /// Node URI list, comma separated for multiple nodes.
    pub uri: String,
    /// Send basic-auth credentials with every request.
    pub require_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Disable automatic proxy detection on the HTTP client.
    pub disable_automatic_proxy_detection: bool,
    /// Accept any server certificate. Dangerous, never use in production;
    /// only for test environments.
    pub danger_accept_all_certificates: bool,
    /// Per-event index name template. The rendered name is lowercased.
    pub index: Template,
    /// Per-event document type template, kept as rendered.
    pub document_type: Template,
    /// Dump every event property into the document (minus exclusions).
    pub include_all_properties: bool,
    pub excluded_properties: Vec<String>,
    /// Additional fields appended to every document.
    pub fields: Vec<FieldConfig>,
    /// Overrides how documents become wire bytes. When set, the encoder
    /// hands the transport structured values instead of rendered lines.
    pub serializer: Option<Arc<dyn DocumentSerializer>>,
    /// Treat the rendered message as an already-serialized JSON document
    /// and ship it verbatim, bypassing the document builder.
    pub pre_serialized_messages: bool,
    /// Pass-through for the host's own failure-reporting policy; the
    /// sink's callback-based error propagation happens regardless.
    pub rethrow_on_failure: bool,
}

impl Default for ElasticConfig {
    fn default() -> Self {
        ElasticConfig {
            connection_string_name: None,
            uri: DEFAULT_URI.to_string(),
            require_auth: false,
            username: None,
            password: None,
            disable_automatic_proxy_detection: false,
            danger_accept_all_certificates: false,
            index: Arc::new(TimestampedIndex::daily("logstash")),
            document_type: template::text("logevent"),
            include_all_properties: false,
            excluded_properties: DEFAULT_EXCLUDED_PROPERTIES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fields: Vec::new(),
            serializer: None,
            pre_serialized_messages: false,
            rethrow_on_failure: false,
        }
    }
}

/// Split a comma-separated URI list into node addresses, defaulting the
/// scheme to plain HTTP when none is given.
pub fn split_nodes(uri: &str) -> Vec<String> {
    uri.split(',')
        .map(str::trim)
        .filter(|node| !node.is_empty())
        .map(|node| {
            if node.starts_with("http://") || node.starts_with("https://") {
                node.to_string()
            } else {
                format!("http://{}", node)
            }
        })
        .collect()
}
