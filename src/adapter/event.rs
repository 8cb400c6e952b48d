//! Structured-event adapter: message template plus a typed property tree.

use crate::client::LogClient;
use crate::record::{Data, ExceptionInfo, LogLevel};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Six-step severity scale of structured events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventLevel {
    Verbose,
    Debug,
    Information,
    Warning,
    Error,
    Fatal,
}

impl From<EventLevel> for LogLevel {
    fn from(level: EventLevel) -> Self {
        match level {
            EventLevel::Verbose | EventLevel::Debug => LogLevel::Debug,
            EventLevel::Information => LogLevel::Info,
            EventLevel::Warning => LogLevel::Warning,
            EventLevel::Error => LogLevel::Error,
            EventLevel::Fatal => LogLevel::Fatal,
        }
    }
}

/// Leaf value of a property tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
}

impl Scalar {
    fn to_json(&self) -> Value {
        match self {
            // Null scalars are shipped as empty strings.
            Scalar::Null => Value::String(String::new()),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::I64(n) => Value::from(*n),
            Scalar::U64(n) => Value::from(*n),
            Scalar::F64(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.to_string())),
            Scalar::Str(s) => Value::String(s.clone()),
        }
    }

    fn to_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::I64(n) => n.to_string(),
            Scalar::U64(n) => n.to_string(),
            Scalar::F64(f) => f.to_string(),
            Scalar::Str(s) => s.clone(),
        }
    }
}

/// Typed property value carried by a [`StructuredEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Scalar(Scalar),
    Sequence(Vec<PropertyValue>),
    /// Named fields, optionally tagged with the type they were captured from.
    Structure {
        type_tag: Option<String>,
        fields: Vec<(String, PropertyValue)>,
    },
    /// Entries keyed by scalars; keys are flattened to their text form.
    Dictionary(Vec<(Scalar, PropertyValue)>),
}

impl PropertyValue {
    /// Flatten into plain JSON.
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Scalar(s) => s.to_json(),
            PropertyValue::Sequence(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            PropertyValue::Structure { fields, .. } => {
                let mut map = Map::new();
                for (name, value) in fields {
                    map.insert(name.clone(), value.to_json());
                }
                Value::Object(map)
            }
            PropertyValue::Dictionary(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.to_text(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }

    fn render(&self) -> String {
        match self {
            PropertyValue::Scalar(s) => s.to_text(),
            PropertyValue::Structure {
                type_tag: Some(tag),
                ..
            } => format!("{} {}", tag, self.to_json()),
            _ => self.to_json().to_string(),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident as $cast:ty),* $(,)?) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(v: $ty) -> Self {
                    PropertyValue::Scalar(Scalar::$variant(v as $cast))
                }
            }
        )*
    };
}

scalar_from!(
    i32 => I64 as i64,
    i64 => I64 as i64,
    u32 => U64 as u64,
    u64 => U64 as u64,
    usize => U64 as u64,
    f64 => F64 as f64,
);

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Scalar(Scalar::Bool(v))
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Scalar(Scalar::Str(v.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Scalar(Scalar::Str(v))
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        PropertyValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PropertyValue::Scalar(Scalar::Null),
            Value::Bool(b) => PropertyValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => PropertyValue::Scalar(if let Some(i) = n.as_i64() {
                Scalar::I64(i)
            } else if let Some(u) = n.as_u64() {
                Scalar::U64(u)
            } else {
                Scalar::F64(n.as_f64().unwrap_or(f64::NAN))
            }),
            Value::String(s) => PropertyValue::Scalar(Scalar::Str(s)),
            Value::Array(items) => PropertyValue::Sequence(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => PropertyValue::Structure {
                type_tag: None,
                fields: map.into_iter().map(|(k, v)| (k, v.into())).collect(),
            },
        }
    }
}

/// One structured log event: a message template with typed properties.
#[derive(Debug, Clone)]
pub struct StructuredEvent {
    pub timestamp: DateTime<Utc>,
    pub level: EventLevel,
    pub template: String,
    pub properties: BTreeMap<String, PropertyValue>,
    pub exception: Option<ExceptionInfo>,
}

impl StructuredEvent {
    pub fn new(level: EventLevel, template: impl Into<String>) -> Self {
        StructuredEvent {
            timestamp: Utc::now(),
            level,
            template: template.into(),
            properties: BTreeMap::new(),
            exception: None,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Render the template, replacing `{Name}`, `{@Name}` and `{$Name}`
    /// holes with property text. `{{` and `}}` are literal braces; format and
    /// alignment suffixes (`{Name,10:000}`) are accepted and ignored. Holes
    /// without a matching property are kept verbatim.
    pub fn render_message(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.char_indices().peekable();

        while let Some((start, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    out.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    out.push('}');
                }
                '{' => match self.template[start..].find('}') {
                    Some(len) => {
                        let hole = &self.template[start + 1..start + len];
                        let name = hole
                            .trim_start_matches(['@', '$'])
                            .split([',', ':'])
                            .next()
                            .unwrap_or_default();
                        match self.properties.get(name) {
                            Some(value) => {
                                let _ = write!(out, "{}", value.render());
                            }
                            None => out.push_str(&self.template[start..=start + len]),
                        }
                        while matches!(chars.peek(), Some((i, _)) if *i <= start + len) {
                            chars.next();
                        }
                    }
                    None => out.push('{'),
                },
                other => out.push(other),
            }
        }
        out
    }

    /// Build the record data: `timestamp`, `messageTemplate`, then every
    /// property not reserved by the `@` / `$` prefixes.
    pub fn to_data(&self) -> Data {
        let mut data = Data::new();
        data.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if !self.template.is_empty() {
            data.insert("messageTemplate".to_string(), Value::String(self.template.clone()));
        }
        for (name, value) in &self.properties {
            if name.starts_with('@') || name.starts_with('$') {
                continue;
            }
            data.insert(name.clone(), value.to_json());
        }
        data
    }
}

/// Forwards [`StructuredEvent`]s to a [`LogClient`].
#[derive(Clone, Debug)]
pub struct EventSink {
    client: LogClient,
}

impl EventSink {
    pub fn new(client: LogClient) -> Self {
        EventSink { client }
    }

    pub fn client(&self) -> &LogClient {
        &self.client
    }

    /// Emit without waiting; see [`LogClient::submit`].
    pub fn emit(&self, event: StructuredEvent) {
        let message = event.render_message();
        let data = event.to_data();
        self.client
            .submit(event.level.into(), message, event.exception, Some(data));
    }

    /// Emit and wait as [`LogClient::log`] would.
    pub async fn emit_async(&self, event: StructuredEvent) {
        let message = event.render_message();
        let data = event.to_data();
        self.client
            .log(event.level.into(), message, event.exception, Some(data))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn levels_collapse_onto_five() {
        assert_eq!(LogLevel::from(EventLevel::Verbose), LogLevel::Debug);
        assert_eq!(LogLevel::from(EventLevel::Debug), LogLevel::Debug);
        assert_eq!(LogLevel::from(EventLevel::Information), LogLevel::Info);
        assert_eq!(LogLevel::from(EventLevel::Warning), LogLevel::Warning);
        assert_eq!(LogLevel::from(EventLevel::Error), LogLevel::Error);
        assert_eq!(LogLevel::from(EventLevel::Fatal), LogLevel::Fatal);
    }

    #[test]
    fn renders_template_holes() {
        let event = StructuredEvent::new(EventLevel::Information, "User {User} paid {@Amount:0.00} in {{EUR}} {Missing}")
            .with_property("User", "ana")
            .with_property("Amount", 12.5);
        assert_eq!(event.render_message(), "User ana paid 12.5 in {EUR} {Missing}");
    }

    #[test]
    fn unterminated_hole_is_literal() {
        let event = StructuredEvent::new(EventLevel::Debug, "open {brace");
        assert_eq!(event.render_message(), "open {brace");
    }

    #[test]
    fn flattens_property_tree() {
        let order = PropertyValue::Structure {
            type_tag: Some("Order".into()),
            fields: vec![
                ("Id".into(), 7.into()),
                ("Tags".into(), vec!["new", "paid"].into()),
                (
                    "Totals".into(),
                    PropertyValue::Dictionary(vec![
                        (Scalar::Str("net".into()), 10.into()),
                        (Scalar::I64(2024), PropertyValue::Scalar(Scalar::Null)),
                    ]),
                ),
            ],
        };
        let event = StructuredEvent::new(EventLevel::Information, "Order {Order}")
            .with_property("Order", order)
            .with_property("@internal", 1)
            .with_property("$type", "skip");

        let data = event.to_data();
        assert_eq!(
            data.get("Order"),
            Some(&json!({
                "Id": 7,
                "Tags": ["new", "paid"],
                "Totals": { "net": 10, "2024": "" }
            }))
        );
        assert!(!data.contains_key("@internal"));
        assert!(!data.contains_key("$type"));
        assert_eq!(data.get("messageTemplate"), Some(&json!("Order {Order}")));
        assert!(data.contains_key("timestamp"));
        assert!(event.render_message().starts_with("Order Order {"));
    }

    #[test]
    fn json_values_convert_to_property_tree() {
        let value: PropertyValue = json!({"a": [1, 2.5, null], "b": true}).into();
        assert_eq!(value.to_json(), json!({"a": [1, 2.5, ""], "b": true}));
    }
}
