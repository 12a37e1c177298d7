//! Lenient decoding of JSON stored in ticket text columns.
//!
//! Malformed values never fail a request: they decode to an empty default,
//! are logged, and are counted in [`malformed_field_count`].

use std::sync::atomic::{AtomicU64, Ordering};

use serde::de::DeserializeOwned;
use serde_json::Value;

static MALFORMED_FIELDS: AtomicU64 = AtomicU64::new(0);

/// Number of malformed JSON fields seen since startup
pub fn malformed_field_count() -> u64 {
    MALFORMED_FIELDS.load(Ordering::Relaxed)
}

fn record_failure(ticket_id: i32, field: &'static str, error: &serde_json::Error) {
    MALFORMED_FIELDS.fetch_add(1, Ordering::Relaxed);
    tracing::warn!(ticket_id, field, %error, "Malformed JSON in ticket field, using empty value");
}

/// Decode `raw` as `T`; absent or blank input yields `T::default()` silently,
/// malformed input yields `T::default()` and is recorded.
pub fn parse_or_default<T>(raw: Option<&str>, ticket_id: i32, field: &'static str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return T::default();
    };

    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            record_failure(ticket_id, field, &e);
            T::default()
        }
    }
}

/// Notification type ids are stored either as a JSON list or a bare number.
pub fn parse_notification_ids(raw: Option<&str>, ticket_id: i32) -> Vec<i32> {
    let value: Value = parse_or_default(raw, ticket_id, "notification_type_id");
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_i64)
            .filter_map(|id| i32::try_from(id).ok())
            .collect(),
        Value::Number(n) => n
            .as_f64()
            .map(|id| vec![id as i32])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
