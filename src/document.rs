use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

use crate::config::{FieldConfig, FieldKind};
use crate::error::SinkError;
use crate::record::{ErrorInfo, LogEvent};

/// Closed set of value kinds a document field can hold.
///
/// Keeping the set closed (instead of an opaque JSON value) lets field
/// coercion be validated when the document is built rather than when the
/// backend rejects the mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Map(Document),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::String(v) => serializer.serialize_str(v),
            FieldValue::Number(v) => serializer.serialize_f64(*v),
            FieldValue::Boolean(v) => serializer.serialize_bool(*v),
            FieldValue::Timestamp(v) => serializer.serialize_str(&v.to_rfc3339()),
            FieldValue::Map(v) => v.serialize(serializer),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Number(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Number(v as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl From<Document> for FieldValue {
    fn from(v: Document) -> Self {
        FieldValue::Map(v)
    }
}

/// Insertion-ordered field map built fresh per event.
///
/// `insert` is first-write-wins: an existing key keeps its value, which is
/// what enforces the overwrite priority between fixed fields, extra fields
/// and the dynamic property dump.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, FieldValue)>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    /// Insert unless the key already exists. Returns whether the value
    /// was stored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> bool {
        let key = key.into();
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value.into()));
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Assembles the field map for one event.
///
/// Step order matters: fixed fields, then exception data, then configured
/// extra fields, then the optional property dump. Combined with
/// first-write-wins insertion, later steps can never replace earlier keys.
pub struct DocumentBuilder {
    fields: Vec<FieldConfig>,
    include_all_properties: bool,
    excluded_properties: HashSet<String>,
}

impl DocumentBuilder {
    pub fn new(
        fields: Vec<FieldConfig>,
        include_all_properties: bool,
        excluded_properties: impl IntoIterator<Item = String>,
    ) -> Self {
        DocumentBuilder {
            fields,
            include_all_properties,
            excluded_properties: excluded_properties.into_iter().collect(),
        }
    }

    pub fn build(&self, event: &LogEvent) -> Result<Document, SinkError> {
        let mut document = Document::new();
        document.insert("@timestamp", event.timestamp);
        document.insert("level", event.level.as_str());
        document.insert("message", event.message.as_str());

        if let Some(error) = &event.error {
            document.insert("exception", flatten_error(error));
        }

        for field in &self.fields {
            let rendered = field.template.render(event);
            // An empty render means the field is omitted, not set to "".
            if rendered.trim().is_empty() {
                continue;
            }
            let value = coerce(&rendered, field.kind).map_err(|reason| {
                SinkError::BuildFailure {
                    reason: format!("field `{}`: {}", field.name, reason),
                }
            })?;
            document.insert(field.name.as_str(), value);
        }

        if self.include_all_properties {
            for (key, value) in event.properties() {
                if self.excluded_properties.contains(key.as_str()) {
                    continue;
                }
                document.insert(key.as_str(), value.clone());
            }
        }

        Ok(document)
    }
}

/// Flatten an error chain into a backend-safe nested map.
///
/// Keys inside the data bag are user-controlled and may contain dots,
/// which Elasticsearch would interpret as nested-field paths; those are
/// rewritten with underscores.
pub fn flatten_error(error: &ErrorInfo) -> Document {
    let mut document = Document::new();
    document.insert("message", error.message.as_str());
    document.insert("type", error.type_name.as_str());
    if let Some(stack_trace) = &error.stack_trace {
        document.insert("stackTrace", stack_trace.as_str());
    }
    if !error.data.is_empty() {
        let mut data = Document::new();
        for (key, value) in &error.data {
            data.insert(rewrite_key(key), rewrite_value(value.clone()));
        }
        document.insert("data", data);
    }
    if let Some(inner) = &error.inner {
        document.insert("innerException", flatten_error(inner));
    }
    document
}

fn rewrite_key(key: &str) -> String {
    key.replace('.', "_")
}

fn rewrite_value(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::Map(map) => {
            let mut rewritten = Document::new();
            for (key, value) in map.entries {
                rewritten.insert(rewrite_key(&key), rewrite_value(value));
            }
            FieldValue::Map(rewritten)
        }
        other => other,
    }
}

fn coerce(rendered: &str, kind: FieldKind) -> Result<FieldValue, String> {
    let trimmed = rendered.trim();
    match kind {
        FieldKind::String => Ok(FieldValue::String(rendered.to_string())),
        FieldKind::Number => trimmed
            .parse::<f64>()
            .map(FieldValue::Number)
            .map_err(|e| format!("cannot coerce `{trimmed}` into a number: {e}")),
        FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(FieldValue::Boolean(true)),
            "false" | "0" => Ok(FieldValue::Boolean(false)),
            _ => Err(format!("cannot coerce `{trimmed}` into a boolean")),
        },
        FieldKind::Timestamp => DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc)))
            .map_err(|e| format!("cannot coerce `{trimmed}` into a timestamp: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template;

    fn bare_builder() -> DocumentBuilder {
        DocumentBuilder::new(Vec::new(), false, Vec::new())
    }

    #[test]
    fn document_insert_is_first_write_wins() {
        let mut doc = Document::new();
        assert!(doc.insert("message", "original"));
        assert!(!doc.insert("message", "imposter"));
        assert_eq!(doc.get("message"), Some(&FieldValue::String("original".into())));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn serialization_preserves_insertion_order() {
        let event = LogEvent::new("Info", "hello");
        let doc = bare_builder().build(&event).unwrap();

        let json = serde_json::to_string(&doc).unwrap();
        let ts = json.find("@timestamp").unwrap();
        let level = json.find("level").unwrap();
        let message = json.find("message").unwrap();
        assert!(ts < level && level < message);
    }

    #[test]
    fn bare_event_yields_exactly_the_fixed_fields() {
        let event = LogEvent::new("Info", "hello");
        let doc = bare_builder().build(&event).unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["@timestamp", "level", "message"]);
    }

    #[test]
    fn excluded_property_never_appears() {
        let builder = DocumentBuilder::new(
            Vec::new(),
            true,
            vec!["ThreadId".to_string()],
        );
        let event = LogEvent::new("Info", "m")
            .with_property("ThreadId", 42i64)
            .with_property("user", "ada");

        let doc = builder.build(&event).unwrap();
        assert!(!doc.contains_key("ThreadId"));
        assert_eq!(doc.get("user"), Some(&FieldValue::String("ada".into())));
    }

    #[test]
    fn dynamic_property_cannot_overwrite_fixed_field() {
        let builder = DocumentBuilder::new(Vec::new(), true, Vec::new());
        let event = LogEvent::new("Info", "the real message").with_property("message", "spoofed");

        let doc = builder.build(&event).unwrap();
        assert_eq!(
            doc.get("message"),
            Some(&FieldValue::String("the real message".into()))
        );
    }

    #[test]
    fn empty_rendered_field_is_omitted_entirely() {
        let fields = vec![FieldConfig::new("request_id", template::text("  "), FieldKind::String)];
        let builder = DocumentBuilder::new(fields, false, Vec::new());

        let doc = builder.build(&LogEvent::new("Info", "m")).unwrap();
        assert!(!doc.contains_key("request_id"));
    }

    #[test]
    fn field_kinds_produce_typed_values() {
        let fields = vec![
            FieldConfig::new("attempts", template::text("3"), FieldKind::Number),
            FieldConfig::new("cached", template::text("true"), FieldKind::Boolean),
            FieldConfig::new(
                "seen_at",
                template::text("2024-01-01T00:00:00Z"),
                FieldKind::Timestamp,
            ),
        ];
        let builder = DocumentBuilder::new(fields, false, Vec::new());

        let doc = builder.build(&LogEvent::new("Info", "m")).unwrap();
        assert_eq!(doc.get("attempts"), Some(&FieldValue::Number(3.0)));
        assert_eq!(doc.get("cached"), Some(&FieldValue::Boolean(true)));
        assert!(matches!(doc.get("seen_at"), Some(FieldValue::Timestamp(_))));
    }

    #[test]
    fn uncoercible_field_fails_the_build() {
        let fields = vec![FieldConfig::new("attempts", template::text("lots"), FieldKind::Number)];
        let builder = DocumentBuilder::new(fields, false, Vec::new());

        let err = builder.build(&LogEvent::new("Info", "m")).unwrap_err();
        assert!(matches!(err, SinkError::BuildFailure { .. }));
        assert!(err.to_string().contains("attempts"));
    }

    #[test]
    fn error_data_keys_with_dots_are_rewritten() {
        let error = ErrorInfo::new("io", "it broke")
            .with_data("user.name", "ada")
            .with_data("plain", 1i64);
        let event = LogEvent::new("Error", "m").with_error(error);

        let doc = bare_builder().build(&event).unwrap();
        let FieldValue::Map(exception) = doc.get("exception").unwrap() else {
            panic!("exception should be a map");
        };
        let FieldValue::Map(data) = exception.get("data").unwrap() else {
            panic!("data should be a map");
        };
        assert!(data.contains_key("user_name"));
        assert!(!data.contains_key("user.name"));
        assert!(data.contains_key("plain"));
    }

    #[test]
    fn inner_error_chain_is_nested_recursively() {
        let error = ErrorInfo::new("outer", "request failed")
            .with_inner(ErrorInfo::new("inner", "socket closed").with_data("fd.num", 7i64));
        let event = LogEvent::new("Error", "m").with_error(error);

        let doc = bare_builder().build(&event).unwrap();
        let FieldValue::Map(exception) = doc.get("exception").unwrap() else {
            panic!("exception should be a map");
        };
        let FieldValue::Map(inner) = exception.get("innerException").unwrap() else {
            panic!("innerException should be a map");
        };
        assert_eq!(inner.get("message"), Some(&FieldValue::String("socket closed".into())));
        let FieldValue::Map(data) = inner.get("data").unwrap() else {
            panic!("inner data should be a map");
        };
        assert!(data.contains_key("fd_num"));
    }
}
