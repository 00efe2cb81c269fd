use crate::record::LogEvent;
use crate::template::Template;

/// Where one document goes: resolved index name plus document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAction {
    pub index: String,
    pub doc_type: String,
}

/// Renders the index-name and document-type templates per event.
///
/// Elasticsearch index identifiers must be lowercase, so the rendered
/// index name is always lowercased; the document type is kept as rendered.
pub struct IndexResolver {
    index: Template,
    doc_type: Template,
}

impl IndexResolver {
    pub fn new(index: Template, doc_type: Template) -> Self {
        IndexResolver { index, doc_type }
    }

    pub fn resolve(&self, event: &LogEvent) -> IndexAction {
        IndexAction {
            index: self.index.render(event).to_lowercase(),
            doc_type: self.doc_type.render(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template;

    #[test]
    fn index_name_is_lowercased_but_doc_type_is_not() {
        let resolver = IndexResolver::new(template::text("Logstash-PROD"), template::text("LogEvent"));
        let action = resolver.resolve(&LogEvent::new("Info", "m"));
        assert_eq!(action.index, "logstash-prod");
        assert_eq!(action.doc_type, "LogEvent");
    }

    #[test]
    fn templates_render_against_the_event() {
        let resolver = IndexResolver::new(
            template::render_with(|ev: &LogEvent| format!("App-{}", ev.level)),
            template::text("logevent"),
        );
        let action = resolver.resolve(&LogEvent::new("Error", "m"));
        assert_eq!(action.index, "app-error");
    }
}
