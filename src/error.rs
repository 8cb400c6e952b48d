/// Errors raised synchronously when a client is constructed with bad input.
///
/// Transmission failures never surface here; they are dropped by the client.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("log name must not be empty")]
    EmptyLogName,

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("batching requires a running Tokio runtime")]
    NoRuntime,
}

/// Error type returned by [`ClientRegistry`](crate::registry::ClientRegistry).
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("a client named {0:?} already exists")]
    AlreadyExists(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Failure of a single transmission attempt.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Request(Box<dyn std::error::Error + Send + Sync>),
}

/// Error returned when installing the global `tracing` subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}
