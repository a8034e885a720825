// ABOUTME: Normalizes the temporal encodings a document store may hand back into UTC instants.
// ABOUTME: Accepts RFC 3339 strings, seconds/nanos objects, and epoch milliseconds.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Value};

/// Interpret a JSON value as a point in time.
///
/// Recognized encodings:
/// - RFC 3339 strings (`"2025-03-01T12:00:00.5Z"`)
/// - objects with `seconds` plus `nanos` or `nanoseconds`
/// - objects with `_seconds` and `_nanoseconds`
/// - numbers, read as milliseconds since the Unix epoch (fractions rounded)
///
/// Returns None for anything else.
pub fn normalize_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|ms| ms.is_finite())
                    .map(|ms| ms.round() as i64)
            })
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(obj) => {
            let seconds = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(Value::as_i64)?;
            let nanos = obj
                .get("nanos")
                .or_else(|| obj.get("nanoseconds"))
                .or_else(|| obj.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).ok()?;
            Utc.timestamp_opt(seconds, nanos).single()
        }
        _ => None,
    }
}

/// Rewrite the named fields of a document into RFC 3339 strings so the
/// document deserializes into a typed record. Fields that are missing or
/// null are left alone. Returns the names of fields whose value could not
/// be interpreted as a timestamp.
pub fn normalize_document(doc: &mut Map<String, Value>, fields: &[&str]) -> Vec<String> {
    let mut unreadable = Vec::new();

    for field in fields {
        let Some(value) = doc.get_mut(*field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match normalize_timestamp(value) {
            Some(dt) => {
                *value = Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true));
            }
            None => unreadable.push((*field).to_string()),
        }
    }

    unreadable
}
