use crate::error::TransportError;
use async_trait::async_trait;
use std::fmt;

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully formed request handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, body: Vec<u8>) -> Self {
        HttpRequest {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Response returned by an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok() -> Self {
        HttpResponse { status: 200, body: Vec::new() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Asynchronous "send an HTTP request" capability used by the client.
///
/// Implementations deal with connection reuse and TLS; the client only
/// builds requests and interprets the status. One call is one attempt: the
/// client never retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the server response.
    ///
    /// **Returns**
    /// - `Ok(response)` for any response that made it back, whatever its
    ///   status. The client turns non-2xx statuses into failures.
    /// - `Err(..)` on connection, DNS or timeout failures.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
