use chrono::{DateTime, Utc};
use serde::Serialize;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Structured key/value payload attached to a [`LogRecord`].
pub type Data = BTreeMap<String, serde_json::Value>;

/// Severity of a [`LogRecord`], ordered from `Debug` (lowest) to `Fatal`.
///
/// The ordering is informational; the client never filters on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One log event as it travels from the caller to the ingestion endpoint.
///
/// Records are immutable once built. They are owned by the caller until
/// enqueued, then by the batch worker until drained for transmission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub data: Data,
    pub exception: Option<ExceptionInfo>,
}

impl LogRecord {
    /// Build a record stamped with a fresh id and the current UTC time.
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        data: Data,
        exception: Option<ExceptionInfo>,
    ) -> Self {
        LogRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            data,
            exception,
        }
    }
}

/// Snapshot of an error and its whole `source()` chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub type_name: String,
    pub message: String,
    pub stack_trace: Option<String>,
    pub inner_exception: Option<Box<ExceptionInfo>>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ExceptionInfo {
            type_name: type_name.into(),
            message: message.into(),
            stack_trace: None,
            inner_exception: None,
        }
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    pub fn with_inner(mut self, inner: ExceptionInfo) -> Self {
        self.inner_exception = Some(Box::new(inner));
        self
    }

    /// Capture `error` and every error reachable through [`Error::source`].
    ///
    /// The outermost snapshot uses the static type name of `E` and carries a
    /// backtrace when `RUST_BACKTRACE` enables capturing. Causes are only
    /// known as `dyn Error`, so their type name is taken from the leading
    /// identifier of their `Debug` output.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let static_name = std::any::type_name::<E>();
        let type_name = if static_name.starts_with("dyn ") {
            debug_type_name(&error)
        } else {
            static_name.to_string()
        };

        let backtrace = Backtrace::capture();
        let stack_trace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        ExceptionInfo {
            type_name,
            message: error.to_string(),
            stack_trace,
            inner_exception: error.source().map(|cause| Box::new(Self::from_cause(cause))),
        }
    }

    fn from_cause(error: &(dyn Error + 'static)) -> Self {
        ExceptionInfo {
            type_name: debug_type_name(&error),
            message: error.to_string(),
            stack_trace: None,
            inner_exception: error.source().map(|cause| Box::new(Self::from_cause(cause))),
        }
    }

    /// Number of snapshots in the chain, this one included.
    pub fn depth(&self) -> usize {
        1 + self.inner_exception.as_ref().map_or(0, |inner| inner.depth())
    }
}

fn debug_type_name(error: &dyn fmt::Debug) -> String {
    let text = format!("{:?}", error);
    let name: String = text
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}
