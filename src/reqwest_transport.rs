use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// [`HttpTransport`] backed by a pooled [`reqwest::Client`] with rustls.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Construct a transport whose requests give up after `timeout`.
    ///
    /// **Returns**
    /// - A ready-to-use [`ReqwestTransport`].
    /// - `Err(..)` if the TLS backend could not be initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_error)?;
        Ok(Self { client })
    }

    /// Construct a transport using the request timeout of `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::new(config.request_timeout)
    }

    /// Wrap an existing client, e.g. one with a proxy already configured.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(Box::new(err))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.body(request.body).send().await.map_err(map_error)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(map_error)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
