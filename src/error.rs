use std::error::Error;
use std::fmt;

/// Fallback shown when a failed response carried no usable body.
pub const NO_ERROR_MESSAGE: &str =
    "no error message; enable trace logging for more information";

/// Why a batch could not be delivered.
///
/// One value is built per failed batch and the same `Arc<SinkError>` is
/// handed to every completion callback in that batch; no per-document
/// distinction is made.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backend answered the bulk request with a non-success status.
    #[error("bulk write rejected with status {status}: {message}")]
    TransportFailure { status: u16, message: String },

    /// The transport failed before a usable response was produced.
    #[error(transparent)]
    TransportError(#[from] TransportError),

    /// A document could not be assembled or serialized from its event.
    #[error("failed to build bulk document: {reason}")]
    BuildFailure { reason: String },
}

impl SinkError {
    /// Status code carried by the failure, if the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            SinkError::TransportFailure { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Native error raised by a transport call.
///
/// The HTTP transport tries every resolved node in order, so a single
/// send can accumulate several causes; `source()` exposes the first one
/// and `causes()` the full set.
#[derive(Debug)]
pub struct TransportError {
    causes: Vec<Box<dyn Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(cause: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        TransportError { causes: vec![cause.into()] }
    }

    /// Aggregate several causes, typically one per attempted node.
    pub fn aggregate(causes: Vec<Box<dyn Error + Send + Sync>>) -> Self {
        debug_assert!(!causes.is_empty());
        TransportError { causes }
    }

    pub fn causes(&self) -> &[Box<dyn Error + Send + Sync>] {
        &self.causes
    }

    pub fn is_aggregate(&self) -> bool {
        self.causes.len() > 1
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.causes.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "all {} attempts failed: ", many.len())?;
                for (i, cause) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", cause)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.causes
            .first()
            .map(|c| c.as_ref() as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cause_displays_directly() {
        let err = TransportError::new("connection refused");
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_aggregate());
    }

    #[test]
    fn aggregate_flattens_all_causes() {
        let err = TransportError::aggregate(vec![
            "node a down".into(),
            "node b down".into(),
        ]);
        assert!(err.is_aggregate());
        let text = err.to_string();
        assert!(text.starts_with("all 2 attempts failed"));
        assert!(text.contains("node a down"));
        assert!(text.contains("node b down"));
    }

    #[test]
    fn status_is_only_set_for_transport_failures() {
        let rejected = SinkError::TransportFailure {
            status: 429,
            message: NO_ERROR_MESSAGE.to_string(),
        };
        assert_eq!(rejected.status(), Some(429));

        let native = SinkError::TransportError(TransportError::new("boom"));
        assert_eq!(native.status(), None);
    }
}
