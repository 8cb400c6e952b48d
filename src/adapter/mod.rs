//! Bridges from logging-framework call shapes to [`LogClient`](crate::client::LogClient).
//!
//! Adapters only translate levels, messages and structured fields. Batching,
//! context and delivery stay in the client.

pub mod event;

#[cfg(feature = "slog")]
pub mod slog;
