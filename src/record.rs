use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::document::FieldValue;
use crate::error::SinkError;

/// Per-event callback reporting delivery outcome back to the host pipeline.
///
/// `None` means the batch was accepted; `Some(err)` carries the failure
/// shared by every event of the batch. Invoked exactly once.
pub type Completion = Box<dyn FnOnce(Option<Arc<SinkError>>) + Send + Sync>;

/// One structured log event handed to the sink.
///
/// The message is already rendered by the host's layout engine; properties
/// keep their insertion order so the built document stays stable.
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub error: Option<ErrorInfo>,
    properties: Vec<(String, FieldValue)>,
    completion: Completion,
}

impl LogEvent {
    pub fn new(level: impl Into<String>, message: impl Into<String>) -> Self {
        LogEvent {
            timestamp: Utc::now(),
            level: level.into(),
            message: message.into(),
            error: None,
            properties: Vec::new(),
            completion: Box::new(|_| {}),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Append a named property. Duplicate keys are kept here; the document
    /// builder resolves them with first-write-wins.
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    /// Install the completion callback invoked after dispatch.
    pub fn on_completion(
        mut self,
        completion: impl FnOnce(Option<Arc<SinkError>>) + Send + Sync + 'static,
    ) -> Self {
        self.completion = Box::new(completion);
        self
    }

    pub fn properties(&self) -> &[(String, FieldValue)] {
        &self.properties
    }

    /// Consume the event and fire its completion callback.
    pub(crate) fn complete(self, outcome: Option<Arc<SinkError>>) {
        (self.completion)(outcome);
    }
}

impl fmt::Debug for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEvent")
            .field("timestamp", &self.timestamp)
            .field("level", &self.level)
            .field("message", &self.message)
            .field("error", &self.error)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Generic error-chain representation attached to an event.
///
/// Captures what the document builder needs without depending on any host
/// error type: message, type name, optional stack trace, an arbitrary data
/// bag, and the inner cause chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub message: String,
    pub type_name: String,
    pub stack_trace: Option<String>,
    pub data: Vec<(String, FieldValue)>,
    pub inner: Option<Box<ErrorInfo>>,
}

impl ErrorInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorInfo {
            message: message.into(),
            type_name: type_name.into(),
            stack_trace: None,
            data: Vec::new(),
            inner: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_data(
        mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    pub fn with_inner(mut self, inner: ErrorInfo) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Capture a standard error and its `source()` chain.
    pub fn from_std<E>(error: &E) -> Self
    where
        E: std::error::Error,
    {
        let mut info = ErrorInfo::new(std::any::type_name::<E>(), error.to_string());
        info.inner = error.source().map(|s| Box::new(Self::from_dyn(s)));
        info
    }

    fn from_dyn(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut info = ErrorInfo::new("error", error.to_string());
        info.inner = error.source().map(|s| Box::new(Self::from_dyn(s)));
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failed")]
    struct Outer {
        #[source]
        cause: std::io::Error,
    }

    #[test]
    fn from_std_walks_the_source_chain() {
        let outer = Outer {
            cause: std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
        };

        let info = ErrorInfo::from_std(&outer);
        assert_eq!(info.message, "outer failed");
        let inner = info.inner.expect("source captured");
        assert_eq!(inner.message, "disk on fire");
        assert!(inner.inner.is_none());
    }

    #[test]
    fn completion_fires_exactly_once_with_outcome() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let event = LogEvent::new("Info", "hello").on_completion(move |outcome| {
            assert!(outcome.is_none());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        event.complete(None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
