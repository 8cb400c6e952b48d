//! Buffered client that ships structured log records to a remote HTTP
//! log-ingestion endpoint.
//!
//! Records are built by [`LogClient`](client::LogClient), either sent one by
//! one or batched by a background worker, and POSTed as JSON through an
//! [`HttpTransport`](transport::HttpTransport). Delivery is best effort.

pub mod record;
pub mod payload;
pub mod config;
pub mod error;
pub mod transport;
pub mod shipper;
mod worker;
pub mod client;
pub mod registry;

pub mod adapter;
pub mod layer;
pub mod init;
pub mod env;

#[cfg(feature = "reqwest-transport")]
pub mod reqwest_transport;

pub mod noop_transport;

pub use client::LogClient;
pub use config::{ClientConfig, CloseBehavior, FieldCasing};
pub use error::{ClientError, RegistryError, TransportError};
pub use record::{Data, ExceptionInfo, LogLevel, LogRecord};
pub use registry::ClientRegistry;
pub use shipper::ClientStats;
pub use transport::{HttpRequest, HttpResponse, HttpTransport};
