use async_trait::async_trait;

use crate::transport::{BulkPayload, Outcome, Transport};

/// A transport that accepts every payload and sends nothing.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// external I/O, and for unit tests that don't care about delivery.
#[derive(Clone, Copy, Default)]
pub struct NoopTransport;

#[async_trait]
impl Transport for NoopTransport {
    async fn send(&self, _payload: BulkPayload) -> Outcome {
        Outcome::Success
    }
}
