use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::payload::{encode_batch, encode_record};
use crate::record::LogRecord;
use crate::transport::{HttpRequest, HttpTransport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Ingestion URLs derived from the configuration and the log name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `{server}[/{namespace}]/logs/{logName}`
    pub single: String,
    /// `{server}[/{namespace}]/logs/{logName}/batch`
    pub batch: String,
}

impl Endpoints {
    pub fn new(config: &ClientConfig, log_name: &str) -> Self {
        let mut prefix = config.server_url.trim().trim_end_matches('/').to_string();
        if config.has_namespace() {
            prefix.push('/');
            prefix.push_str(&urlencoding::encode(&config.namespace));
        }
        let single = format!("{}/logs/{}", prefix, urlencoding::encode(log_name));
        let batch = format!("{}/batch", single);
        Endpoints { single, batch }
    }
}

/// Running counters shared by a client and its batch worker.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub enqueued: AtomicU64,
    pub dropped: AtomicU64,
    pub sent: AtomicU64,
    pub failed: AtomicU64,
    pub batches: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64, by: usize) {
        counter.fetch_add(by as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ClientStats {
        ClientStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a client's counters.
///
/// `sent` and `failed` count records, `batches` counts batch requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub submitted: u64,
    pub rejected: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub sent: u64,
    pub failed: u64,
    pub batches: u64,
}

/// Encodes records and performs one best-effort POST per call.
///
/// Failures are counted and, in debug mode, printed to stderr. They are
/// never returned: the record is gone once a send has been attempted.
pub(crate) struct Shipper {
    transport: Arc<dyn HttpTransport>,
    config: Arc<ClientConfig>,
    endpoints: Endpoints,
    headers: Vec<(String, String)>,
    counters: Arc<Counters>,
}

impl Shipper {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: Arc<ClientConfig>,
        endpoints: Endpoints,
        counters: Arc<Counters>,
    ) -> Self {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(key) = config.api_key.as_ref().filter(|k| !k.is_empty()) {
            headers.push((API_KEY_HEADER.to_string(), key.clone()));
        }
        headers.extend(config.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        Shipper {
            transport,
            config,
            endpoints,
            headers,
            counters,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send one record to the single-record endpoint.
    pub async fn send_one(&self, record: LogRecord) {
        let body = encode_record(&record, self.config.casing);
        self.deliver(&self.endpoints.single, body, 1).await;
    }

    /// Send `records`, in order, as one request to the batch endpoint.
    pub async fn send_batch(&self, records: Vec<LogRecord>) {
        if records.is_empty() {
            return;
        }
        Counters::bump(&self.counters.batches, 1);
        let body = encode_batch(&records, self.config.casing);
        self.deliver(&self.endpoints.batch, body, records.len()).await;
    }

    async fn deliver(&self, url: &str, body: Result<Vec<u8>, serde_json::Error>, count: usize) {
        let result = match body {
            Ok(body) => self.attempt(url, body).await,
            Err(e) => Err(TransportError::from(e)),
        };

        match result {
            Ok(()) => Counters::bump(&self.counters.sent, count),
            Err(e) => {
                Counters::bump(&self.counters.failed, count);
                if self.config.debug {
                    eprintln!("error sending {} log record(s) to {}: {}", count, url, e);
                }
            }
        }
    }

    async fn attempt(&self, url: &str, body: Vec<u8>) -> Result<(), TransportError> {
        let mut request = HttpRequest::post(url, body);
        request.headers = self.headers.clone();

        let resp = tokio::time::timeout(self.config.request_timeout, self.transport.send(request))
            .await
            .map_err(|_| TransportError::Timeout)??;

        if resp.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                status: resp.status,
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(url: &str, namespace: &str, log: &str) -> Endpoints {
        let cfg = ClientConfig::new(url).with_namespace(namespace);
        Endpoints::new(&cfg, log)
    }

    #[test]
    fn default_namespace_is_omitted() {
        let e = endpoints("http://logs.local:3030", "default", "orders");
        assert_eq!(e.single, "http://logs.local:3030/logs/orders");
        assert_eq!(e.batch, "http://logs.local:3030/logs/orders/batch");

        let e = endpoints("http://logs.local:3030", "", "orders");
        assert_eq!(e.single, "http://logs.local:3030/logs/orders");
    }

    #[test]
    fn custom_namespace_adds_segment() {
        let e = endpoints("https://logs.local/", "team-a", "orders");
        assert_eq!(e.single, "https://logs.local/team-a/logs/orders");
        assert_eq!(e.batch, "https://logs.local/team-a/logs/orders/batch");
    }

    #[test]
    fn path_segments_are_encoded() {
        let e = endpoints("http://h", "my ns", "a/b");
        assert_eq!(e.single, "http://h/my%20ns/logs/a%2Fb");
    }
}
