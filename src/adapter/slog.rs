//! Leveled-logger adapter: a [`slog::Drain`] that forwards to a [`LogClient`].

use crate::client::LogClient;
use crate::record::{Data, ExceptionInfo, LogLevel};
use ::slog::{Drain, Key, Level, Never, OwnedKVList, Record, Serializer, KV};
use serde_json::Value;
use std::fmt;
use std::panic::AssertUnwindSafe;

/// Map slog's six levels onto the five record levels.
pub fn map_level(level: Level) -> LogLevel {
    match level {
        Level::Trace | Level::Debug => LogLevel::Debug,
        Level::Info => LogLevel::Info,
        Level::Warning => LogLevel::Warning,
        Level::Error => LogLevel::Error,
        Level::Critical => LogLevel::Fatal,
    }
}

/// What the drain copies into record data besides the call's own values.
#[derive(Debug, Clone, Copy)]
pub struct DrainOptions {
    /// Copy the key/values of the logger chain (`o!(..)` at each level).
    pub include_scopes: bool,
    /// Add `eventId` with the `file:line` of the call site.
    pub include_event_ids: bool,
}

impl Default for DrainOptions {
    fn default() -> Self {
        DrainOptions {
            include_scopes: true,
            include_event_ids: true,
        }
    }
}

/// [`Drain`] that turns every slog record into one [`LogClient::submit`].
///
/// Record data is assembled in this order, later keys overwriting earlier
/// ones: `category` (module path), `tag`, `eventId`, the logger chain's
/// values (innermost logger first; the first value seen for a key is kept),
/// then the record's own values. A value logged with slog's `#` error sigil
/// becomes the record exception.
pub struct ShipperDrain {
    // The client recovers poisoned locks itself.
    client: AssertUnwindSafe<LogClient>,
    options: DrainOptions,
}

impl ShipperDrain {
    pub fn new(client: LogClient) -> Self {
        Self::with_options(client, DrainOptions::default())
    }

    pub fn with_options(client: LogClient, options: DrainOptions) -> Self {
        ShipperDrain {
            client: AssertUnwindSafe(client),
            options,
        }
    }

    pub fn client(&self) -> &LogClient {
        &self.client.0
    }
}

impl Drain for ShipperDrain {
    type Ok = ();
    type Err = Never;

    fn log(&self, record: &Record<'_>, values: &OwnedKVList) -> Result<(), Never> {
        let message = record.msg().to_string();

        let mut data = Data::new();
        data.insert("category".to_string(), Value::from(record.module()));
        if !record.tag().is_empty() {
            data.insert("tag".to_string(), Value::from(record.tag()));
        }
        if self.options.include_event_ids {
            data.insert(
                "eventId".to_string(),
                Value::from(format!("{}:{}", record.file(), record.line())),
            );
        }

        if self.options.include_scopes {
            let mut scope = FieldCollector::keep_first();
            let _ = values.serialize(record, &mut scope);
            data.extend(scope.fields);
        }

        let mut state = FieldCollector::keep_last();
        let _ = record.kv().serialize(record, &mut state);
        data.extend(state.fields);

        self.client
            .0
            .submit(map_level(record.level()), message, state.exception, Some(data));
        Ok(())
    }
}

/// slog [`Serializer`] that collects values as JSON.
struct FieldCollector {
    fields: Data,
    exception: Option<ExceptionInfo>,
    keep_first: bool,
}

impl FieldCollector {
    fn keep_first() -> Self {
        FieldCollector {
            fields: Data::new(),
            exception: None,
            keep_first: true,
        }
    }

    fn keep_last() -> Self {
        FieldCollector {
            keep_first: false,
            ..Self::keep_first()
        }
    }

    fn put(&mut self, key: Key, value: Value) -> ::slog::Result {
        let key = key.to_string();
        if self.keep_first && self.fields.contains_key(&key) {
            return Ok(());
        }
        self.fields.insert(key, value);
        Ok(())
    }
}

macro_rules! emit_number {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, key: Key, val: $ty) -> ::slog::Result {
                self.put(key, Value::from(val))
            }
        )*
    };
}

impl Serializer for FieldCollector {
    emit_number!(
        emit_usize: usize,
        emit_isize: isize,
        emit_u8: u8,
        emit_i8: i8,
        emit_u16: u16,
        emit_i16: i16,
        emit_u32: u32,
        emit_i32: i32,
        emit_u64: u64,
        emit_i64: i64,
        emit_f32: f32,
        emit_f64: f64,
    );

    fn emit_bool(&mut self, key: Key, val: bool) -> ::slog::Result {
        self.put(key, Value::Bool(val))
    }

    fn emit_char(&mut self, key: Key, val: char) -> ::slog::Result {
        self.put(key, Value::String(val.to_string()))
    }

    fn emit_str(&mut self, key: Key, val: &str) -> ::slog::Result {
        self.put(key, Value::from(val))
    }

    fn emit_unit(&mut self, key: Key) -> ::slog::Result {
        self.put(key, Value::Null)
    }

    fn emit_none(&mut self, key: Key) -> ::slog::Result {
        self.put(key, Value::Null)
    }

    fn emit_arguments(&mut self, key: Key, val: &fmt::Arguments<'_>) -> ::slog::Result {
        self.put(key, Value::String(val.to_string()))
    }

    fn emit_error(&mut self, key: Key, error: &(dyn std::error::Error + 'static)) -> ::slog::Result {
        if self.exception.is_none() {
            self.exception = Some(ExceptionInfo::from_error(error));
        }
        self.put(key, Value::String(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::error::TransportError;
    use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
    use ::slog::{o, Logger};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Captured(Mutex<Vec<Vec<u8>>>);

    #[async_trait]
    impl HttpTransport for Captured {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.0.lock().unwrap().push(request.body);
            Ok(HttpResponse::ok())
        }
    }

    async fn shipped_data(options: DrainOptions) -> Value {
        let captured = Arc::new(Captured::default());
        let config = ClientConfig::default().with_batching(10, Duration::ZERO);
        let client = LogClient::new("slog", config, captured.clone()).unwrap();
        let logger = Logger::root(ShipperDrain::with_options(client.clone(), options), o!("service" => "billing"));

        ::slog::info!(logger, "invoice sent"; "invoice" => 17);
        client.flush().await;

        let bodies = captured.0.lock().unwrap();
        let batch: Value = serde_json::from_slice(&bodies[0]).unwrap();
        batch[0]["data"].clone()
    }

    #[tokio::test]
    async fn default_options_ship_scope_and_event_id() {
        let data = shipped_data(DrainOptions::default()).await;
        assert_eq!(data["service"], "billing");
        assert!(data["eventId"].as_str().unwrap().contains(':'));
        assert_eq!(data["invoice"], 17);
    }

    #[tokio::test]
    async fn disabled_options_drop_scope_and_event_id() {
        let options = DrainOptions {
            include_scopes: false,
            include_event_ids: false,
        };
        let data = shipped_data(options).await;
        assert!(data.get("service").is_none());
        assert!(data.get("eventId").is_none());
        assert_eq!(data["invoice"], 17);
        assert!(data["category"].is_string());
    }

    #[test]
    fn six_levels_collapse_onto_five() {
        assert_eq!(map_level(Level::Trace), LogLevel::Debug);
        assert_eq!(map_level(Level::Debug), LogLevel::Debug);
        assert_eq!(map_level(Level::Info), LogLevel::Info);
        assert_eq!(map_level(Level::Warning), LogLevel::Warning);
        assert_eq!(map_level(Level::Error), LogLevel::Error);
        assert_eq!(map_level(Level::Critical), LogLevel::Fatal);
    }

    #[test]
    fn collector_precedence() {
        let mut first = FieldCollector::keep_first();
        first.emit_str("k", "inner").unwrap();
        first.emit_str("k", "outer").unwrap();
        assert_eq!(first.fields["k"], "inner");

        let mut last = FieldCollector::keep_last();
        last.emit_u64("n", 1).unwrap();
        last.emit_u64("n", 2).unwrap();
        assert_eq!(last.fields["n"], 2);
    }
}
