use crate::client::LogClient;
use crate::record::{Data, ExceptionInfo, LogLevel};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never shipped: this crate and the HTTP stack it
/// sends through, which would otherwise log about its own deliveries.
const DEFAULT_IGNORED_TARGETS: &[&str] = &[env!("CARGO_CRATE_NAME"), "hyper", "h2", "reqwest", "rustls"];

/// `tracing_subscriber` layer that forwards events to a [`LogClient`].
///
/// Each event becomes one record: `TRACE`/`DEBUG` map to `Debug`, `INFO` to
/// `Info`, `WARN` to `Warning` and `ERROR` to `Error`. Data holds
/// `category` (the target), `eventName`, source location, the fields of the
/// enclosing spans (innermost span wins) and finally the event's own fields.
/// An error recorded as a field becomes the record exception.
///
/// Forwarding uses [`LogClient::submit`], so application threads never
/// wait on network I/O when the client batches.
pub struct ShipperLayer {
    client: LogClient,
    max_level: Level,
    ignored_targets: Vec<String>,
    /// Total events seen by the layer (before filtering).
    pub total_events: Arc<AtomicU64>,
    /// Events handed to the client.
    pub forwarded_events: Arc<AtomicU64>,
}

impl ShipperLayer {
    pub fn new(client: LogClient) -> Self {
        ShipperLayer {
            client,
            max_level: Level::TRACE,
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
            total_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Only forward events at `level` or more severe.
    pub fn with_max_level(mut self, level: Level) -> Self {
        self.max_level = level;
        self
    }

    /// Never forward events whose target is `prefix` or a module below it.
    pub fn ignore_target(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_targets.push(prefix.into());
        self
    }

    pub fn client(&self) -> &LogClient {
        &self.client
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|prefix| {
            target
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

pub fn map_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE | Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warning,
        Level::ERROR => LogLevel::Error,
    }
}

/// Span fields stored in the span's extensions.
struct SpanFields(Data);

impl<S> Layer<S> for ShipperLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = Data::new();
        let mut message = None;
        let mut exception = None;
        attrs.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            exception: &mut exception,
        });
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(SpanFields(fields)) = extensions.get_mut::<SpanFields>() {
            let mut message = None;
            let mut exception = None;
            values.record(&mut FieldVisitor {
                fields,
                message: &mut message,
                exception: &mut exception,
            });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.max_level || self.is_ignored(meta.target()) {
            return;
        }

        let mut data = Data::new();
        data.insert("category".to_string(), meta.target().into());
        data.insert("eventName".to_string(), meta.name().into());
        if let Some(file) = meta.file() {
            data.insert("file".to_string(), file.into());
        }
        if let Some(line) = meta.line() {
            data.insert("line".to_string(), line.into());
        }

        if let Some(scope) = ctx.event_scope(event) {
            let mut span_fields = Data::new();
            for span in scope {
                let extensions = span.extensions();
                if let Some(SpanFields(fields)) = extensions.get::<SpanFields>() {
                    for (key, value) in fields {
                        span_fields.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
            data.extend(span_fields);
        }

        let mut fields = Data::new();
        let mut message: Option<String> = None;
        let mut exception: Option<ExceptionInfo> = None;
        event.record(&mut FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            exception: &mut exception,
        });
        data.extend(fields);

        self.client.submit(
            map_level(meta.level()),
            message.unwrap_or_default(),
            exception,
            Some(data),
        );
        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Data,
    pub message: &'a mut Option<String>,
    pub exception: &'a mut Option<ExceptionInfo>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.exception.is_none() {
            *self.exception = Some(ExceptionInfo::from_error(value));
        }
        self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_levels_map_onto_record_levels() {
        assert_eq!(map_level(&Level::TRACE), LogLevel::Debug);
        assert_eq!(map_level(&Level::DEBUG), LogLevel::Debug);
        assert_eq!(map_level(&Level::INFO), LogLevel::Info);
        assert_eq!(map_level(&Level::WARN), LogLevel::Warning);
        assert_eq!(map_level(&Level::ERROR), LogLevel::Error);
    }

    #[test]
    fn own_target_is_ignored() {
        let client = LogClient::new(
            "layer",
            crate::config::ClientConfig::default().without_batching(),
            Arc::new(crate::noop_transport::NoopTransport),
        )
        .unwrap();
        let layer = ShipperLayer::new(client).ignore_target("noisy");
        assert!(layer.is_ignored("tracing_log_shipper::worker"));
        assert!(layer.is_ignored("hyper::client"));
        assert!(layer.is_ignored("noisy::thing"));
        assert!(!layer.is_ignored("app::handler"));
    }

    #[test]
    fn ignored_targets_match_whole_path_segments() {
        let client = LogClient::new(
            "layer",
            crate::config::ClientConfig::default().without_batching(),
            Arc::new(crate::noop_transport::NoopTransport),
        )
        .unwrap();
        let layer = ShipperLayer::new(client);
        assert!(layer.is_ignored("hyper"));
        assert!(layer.is_ignored("h2::codec"));
        assert!(!layer.is_ignored("hyperion_api"));
        assert!(!layer.is_ignored("h2o_billing::invoice"));
        assert!(!layer.is_ignored("tracing_log_shipper_demo"));
    }
}
