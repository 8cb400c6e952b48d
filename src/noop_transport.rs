use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;

/// A transport that accepts every request without doing any I/O.
///
/// Useful for measuring the overhead of the client itself, and for unit
/// tests that don't care about what reaches the server.
#[derive(Clone, Default)]
pub struct NoopTransport;

#[async_trait]
impl HttpTransport for NoopTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::ok())
    }
}
