use std::sync::Arc;

use crate::record::LogEvent;

/// Renders a string from an event at dispatch time.
///
/// The real rendering engine belongs to the host; this seam only carries
/// what the sink needs for index names, document types and extra fields.
/// Hosts usually pass a fixed string via [`text`] or a closure via
/// [`render_with`].
pub trait EventTemplate: Send + Sync {
    fn render(&self, event: &LogEvent) -> String;
}

/// Shared template handle stored in the sink configuration.
pub type Template = Arc<dyn EventTemplate>;

/// Template that ignores the event and always renders the same text.
pub fn text(value: impl Into<String>) -> Template {
    Arc::new(Text(value.into()))
}

/// Template backed by a closure over the event.
pub fn render_with<F>(render: F) -> Template
where
    F: Fn(&LogEvent) -> String + Send + Sync + 'static,
{
    Arc::new(FnTemplate(render))
}

struct Text(String);

impl EventTemplate for Text {
    fn render(&self, _event: &LogEvent) -> String {
        self.0.clone()
    }
}

struct FnTemplate<F>(F);

impl<F> EventTemplate for FnTemplate<F>
where
    F: Fn(&LogEvent) -> String + Send + Sync,
{
    fn render(&self, event: &LogEvent) -> String {
        (self.0)(event)
    }
}

/// Rolling index pattern: `{prefix}-{event timestamp, formatted}`.
///
/// The default sink configuration uses `logstash` with `%Y.%m.%d`, so a
/// January 1st event lands in `logstash-2024.01.01`.
pub struct TimestampedIndex {
    prefix: String,
    date_format: String,
}

impl TimestampedIndex {
    pub fn new(prefix: impl Into<String>, date_format: impl Into<String>) -> Self {
        TimestampedIndex {
            prefix: prefix.into(),
            date_format: date_format.into(),
        }
    }

    pub fn daily(prefix: impl Into<String>) -> Self {
        TimestampedIndex::new(prefix, "%Y.%m.%d")
    }
}

impl EventTemplate for TimestampedIndex {
    fn render(&self, event: &LogEvent) -> String {
        format!(
            "{}-{}",
            self.prefix,
            event.timestamp.format(&self.date_format)
        )
    }
}
