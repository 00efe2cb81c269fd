use serde::Serialize;

use crate::document::Document;
use crate::error::SinkError;
use crate::index::IndexAction;

/// One document unit of a batch: either a field map built by the
/// [`DocumentBuilder`](crate::document::DocumentBuilder), or a message
/// that is already a serialized JSON document and ships verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkDocument {
    Built(Document),
    Raw(String),
}

/// Ordered (action, document) pairs, one per input event.
///
/// Positional correspondence with the submitted events is preserved all
/// the way to the wire, so pair `i` always describes event `i`.
#[derive(Debug, Default)]
pub struct BatchRequest {
    pairs: Vec<(IndexAction, BulkDocument)>,
}

impl BatchRequest {
    pub fn with_capacity(capacity: usize) -> Self {
        BatchRequest { pairs: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, action: IndexAction, document: BulkDocument) {
        self.pairs.push((action, document));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(IndexAction, BulkDocument)> {
        self.pairs.iter()
    }
}

#[derive(Serialize)]
struct ActionLine<'a> {
    index: ActionMeta<'a>,
}

#[derive(Serialize)]
struct ActionMeta<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
}

fn action_line(action: &IndexAction) -> ActionLine<'_> {
    ActionLine {
        index: ActionMeta {
            index: &action.index,
            doc_type: &action.doc_type,
        },
    }
}

/// Render the batch as newline-delimited JSON for the `_bulk` endpoint:
/// an action line immediately followed by its document line, per pair,
/// with a trailing newline on the whole body.
pub fn encode_lines(batch: &BatchRequest) -> Result<String, SinkError> {
    let mut body = String::new();
    for (action, document) in batch.iter() {
        body.push_str(&to_line(&action_line(action))?);
        body.push('\n');
        match document {
            BulkDocument::Built(doc) => body.push_str(&to_line(doc)?),
            BulkDocument::Raw(raw) => body.push_str(raw.trim_end()),
        }
        body.push('\n');
    }
    Ok(body)
}

/// Render the batch as alternating structured values, for transports that
/// serialize documents themselves via a custom serializer.
pub fn encode_structured(batch: &BatchRequest) -> Result<Vec<serde_json::Value>, SinkError> {
    let mut units = Vec::with_capacity(batch.len() * 2);
    for (action, document) in batch.iter() {
        units.push(to_value(&action_line(action))?);
        match document {
            BulkDocument::Built(doc) => units.push(to_value(doc)?),
            BulkDocument::Raw(raw) => units.push(serde_json::from_str(raw).map_err(|e| {
                SinkError::BuildFailure {
                    reason: format!("pre-serialized message is not valid JSON: {e}"),
                }
            })?),
        }
    }
    Ok(units)
}

fn to_line<T: Serialize>(value: &T) -> Result<String, SinkError> {
    serde_json::to_string(value).map_err(|e| SinkError::BuildFailure {
        reason: format!("cannot serialize bulk unit: {e}"),
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, SinkError> {
    serde_json::to_value(value).map_err(|e| SinkError::BuildFailure {
        reason: format!("cannot serialize bulk unit: {e}"),
    })
}
