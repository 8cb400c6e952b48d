//! Environment variable names read by [`config_from_env`].
//!
//! These are purely helpers; [`ClientConfig`] itself never touches the
//! environment.

use crate::config::{ClientConfig, CloseBehavior, FieldCasing};
use crate::error::ClientError;
use std::str::FromStr;
use std::time::Duration;

/// Base URL of the ingestion server, e.g. `http://127.0.0.1:3030`.
pub const LOG_SHIPPER_SERVER_URL_ENV: &str = "LOG_SHIPPER_SERVER_URL";

/// Namespace path segment.
pub const LOG_SHIPPER_NAMESPACE_ENV: &str = "LOG_SHIPPER_NAMESPACE";

/// Optional API key sent as `X-API-Key`.
pub const LOG_SHIPPER_API_KEY_ENV: &str = "LOG_SHIPPER_API_KEY";

/// `true` / `false`: batch records through the background worker.
pub const LOG_SHIPPER_ASYNC_ENABLED_ENV: &str = "LOG_SHIPPER_ASYNC_ENABLED";

/// Records per batch.
pub const LOG_SHIPPER_BATCH_SIZE_ENV: &str = "LOG_SHIPPER_BATCH_SIZE";

/// Timer flush period in milliseconds; `0` disables the timer.
pub const LOG_SHIPPER_BATCH_INTERVAL_MS_ENV: &str = "LOG_SHIPPER_BATCH_INTERVAL_MS";

/// Per-request timeout in milliseconds.
pub const LOG_SHIPPER_TIMEOUT_MS_ENV: &str = "LOG_SHIPPER_TIMEOUT_MS";

/// `true` / `false`: print transmission failures to stderr.
pub const LOG_SHIPPER_DEBUG_ENV: &str = "LOG_SHIPPER_DEBUG";

/// Optional bound on pending records.
pub const LOG_SHIPPER_MAX_PENDING_ENV: &str = "LOG_SHIPPER_MAX_PENDING";

/// `camel` or `snake` field casing.
pub const LOG_SHIPPER_CASING_ENV: &str = "LOG_SHIPPER_CASING";

/// `discard` or `drain`.
pub const LOG_SHIPPER_CLOSE_ENV: &str = "LOG_SHIPPER_CLOSE";

/// Build a [`ClientConfig`] from `LOG_SHIPPER_*` variables, starting from
/// [`ClientConfig::default`] for anything unset.
pub fn config_from_env() -> Result<ClientConfig, ClientError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`config_from_env`] with a custom variable source.
pub fn config_from_lookup<F>(lookup: F) -> Result<ClientConfig, ClientError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(url) = lookup(LOG_SHIPPER_SERVER_URL_ENV) {
        config.server_url = url;
    }
    if let Some(namespace) = lookup(LOG_SHIPPER_NAMESPACE_ENV) {
        config.namespace = namespace;
    }
    config.api_key = lookup(LOG_SHIPPER_API_KEY_ENV).filter(|k| !k.is_empty());
    if let Some(v) = parse(&lookup, LOG_SHIPPER_ASYNC_ENABLED_ENV)? {
        config.async_enabled = v;
    }
    if let Some(v) = parse(&lookup, LOG_SHIPPER_BATCH_SIZE_ENV)? {
        config.batch_size = v;
    }
    if let Some(ms) = parse(&lookup, LOG_SHIPPER_BATCH_INTERVAL_MS_ENV)? {
        config.batch_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = parse(&lookup, LOG_SHIPPER_TIMEOUT_MS_ENV)? {
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(v) = parse(&lookup, LOG_SHIPPER_DEBUG_ENV)? {
        config.debug = v;
    }
    if let Some(v) = parse(&lookup, LOG_SHIPPER_MAX_PENDING_ENV)? {
        config.max_pending = Some(v);
    }
    if let Some(casing) = lookup(LOG_SHIPPER_CASING_ENV) {
        config.casing = match casing.to_ascii_lowercase().as_str() {
            "camel" | "camelcase" => FieldCasing::CamelCase,
            "snake" | "snake_case" => FieldCasing::SnakeCase,
            other => return Err(invalid(LOG_SHIPPER_CASING_ENV, other)),
        };
    }
    if let Some(close) = lookup(LOG_SHIPPER_CLOSE_ENV) {
        config.close_behavior = match close.to_ascii_lowercase().as_str() {
            "discard" => CloseBehavior::Discard,
            "drain" => CloseBehavior::Drain,
            other => return Err(invalid(LOG_SHIPPER_CLOSE_ENV, other)),
        };
    }

    config.validate()?;
    Ok(config)
}

fn parse<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ClientError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, &raw)),
        None => Ok(None),
    }
}

fn invalid(key: &str, value: &str) -> ClientError {
    ClientError::InvalidConfig(format!("{} has invalid value {:?}", key, value))
}
