use crate::error::ClientError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Namespace value that is treated as "no namespace" in endpoint paths.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Casing applied to the record's own field names on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldCasing {
    #[default]
    CamelCase,
    SnakeCase,
}

/// What [`LogClient::close`](crate::client::LogClient::close) does with
/// records that are still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseBehavior {
    /// Stop immediately and discard pending records.
    #[default]
    Discard,
    /// Send every pending record before stopping.
    Drain,
}

/// Immutable configuration handed to a [`LogClient`](crate::client::LogClient).
///
/// **Fields**
/// - `server_url`: base URL of the ingestion server, e.g. `http://localhost:3030`.
/// - `namespace`: optional path segment placed before `/logs`. Empty or
///   `"default"` omits it.
/// - `api_key`: sent as `X-API-Key` when set.
/// - `async_enabled` / `batch_size`: records are batched only when both
///   `async_enabled` is true and `batch_size > 1`.
/// - `batch_interval`: period of the timer-driven flush; zero disables it.
/// - `request_timeout`: upper bound for one transmission attempt.
/// - `headers`: extra headers added to every request.
/// - `debug`: print transmission failures to stderr.
/// - `max_pending`: optional bound on queued records; new records are dropped
///   once it is reached.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub server_url: String,
    pub namespace: String,
    pub api_key: Option<String>,
    pub async_enabled: bool,
    pub batch_size: usize,
    pub batch_interval: Duration,
    pub request_timeout: Duration,
    pub headers: BTreeMap<String, String>,
    pub casing: FieldCasing,
    pub debug: bool,
    pub max_pending: Option<usize>,
    pub close_behavior: CloseBehavior,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3030".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            api_key: None,
            async_enabled: true,
            batch_size: 100,
            batch_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
            casing: FieldCasing::CamelCase,
            debug: false,
            max_pending: None,
            close_behavior: CloseBehavior::Discard,
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Configure batching. A `batch_size` of 1 sends every record immediately.
    pub fn with_batching(mut self, batch_size: usize, batch_interval: Duration) -> Self {
        self.async_enabled = true;
        self.batch_size = batch_size;
        self.batch_interval = batch_interval;
        self
    }

    /// Send every record as soon as it is logged.
    pub fn without_batching(mut self) -> Self {
        self.async_enabled = false;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_casing(mut self, casing: FieldCasing) -> Self {
        self.casing = casing;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }

    pub fn with_close_behavior(mut self, close_behavior: CloseBehavior) -> Self {
        self.close_behavior = close_behavior;
        self
    }

    /// True when records go through the batch worker instead of being sent
    /// one by one.
    pub fn batching_enabled(&self) -> bool {
        self.async_enabled && self.batch_size > 1
    }

    /// True when the configured namespace contributes a path segment.
    pub fn has_namespace(&self) -> bool {
        !self.namespace.is_empty() && self.namespace != DEFAULT_NAMESPACE
    }

    /// Check the invariants a client relies on.
    pub fn validate(&self) -> Result<(), ClientError> {
        let url = self.server_url.trim();
        if url.is_empty() {
            return Err(ClientError::InvalidConfig("server_url is empty".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::InvalidConfig(format!(
                "server_url must start with http:// or https://, got {}",
                url
            )));
        }
        if self.batch_size == 0 {
            return Err(ClientError::InvalidConfig("batch_size must be at least 1".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::InvalidConfig("request_timeout must be positive".into()));
        }
        if self.max_pending == Some(0) {
            return Err(ClientError::InvalidConfig("max_pending must be at least 1".into()));
        }
        Ok(())
    }
}
