//! JSON wire encoding for single records and batches.

use crate::config::FieldCasing;
use crate::record::{Data, LogRecord};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// Record field names that differ between the camelCase and snake_case wire
/// shapes. Keys inside `data` are user-owned and never rewritten.
const SNAKE_RENAMES: &[(&str, &str)] = &[
    ("stackTrace", "stack_trace"),
    ("innerException", "inner_exception"),
];

/// Serialize one record for the single-record endpoint.
pub fn encode_record(record: &LogRecord, casing: FieldCasing) -> Result<Vec<u8>, serde_json::Error> {
    let value = record_value(record, casing)?;
    serde_json::to_vec(&value)
}

/// Serialize an ordered batch as a JSON array for the batch endpoint.
pub fn encode_batch(records: &[LogRecord], casing: FieldCasing) -> Result<Vec<u8>, serde_json::Error> {
    let values = records
        .iter()
        .map(|record| record_value(record, casing))
        .collect::<Result<Vec<_>, _>>()?;
    serde_json::to_vec(&values)
}

fn record_value(record: &LogRecord, casing: FieldCasing) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(record)?;
    if casing == FieldCasing::SnakeCase {
        if let Some(exception) = value.get_mut("exception") {
            rename_exception_fields(exception);
        }
    }
    Ok(value)
}

fn rename_exception_fields(exception: &mut Value) {
    let Value::Object(map) = exception else {
        return;
    };
    for (camel, snake) in SNAKE_RENAMES {
        if let Some(v) = map.remove(*camel) {
            map.insert((*snake).to_string(), v);
        }
    }
    if let Some(inner) = map.get_mut("inner_exception") {
        rename_exception_fields(inner);
    }
}

/// Convert an arbitrary serializable payload into record [`Data`].
///
/// A payload that serializes to a JSON object becomes the mapping itself.
/// Any other shape is wrapped as `{"data": <value>}`, and a payload that
/// cannot be serialized at all is wrapped as `{"data": "<debug text>"}`.
pub fn to_data<T>(payload: &T) -> Data
where
    T: Serialize + Debug + ?Sized,
{
    let mut data = Data::new();
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => data.extend(map),
        Ok(other) => {
            data.insert("data".to_string(), other);
        }
        Err(_) => {
            data.insert("data".to_string(), Value::String(format!("{:?}", payload)));
        }
    }
    data
}
