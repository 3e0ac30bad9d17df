//! Helper utilities for building driver responses in tests.

use serde_json::{Value as JsonValue, json};

/// One `organisation` row shaped like the database returns it.
#[must_use]
pub fn organisation_row(id: u32, name: &str, is_enabled: bool) -> JsonValue {
    json!({
        "id": format!("organisation:{id}"),
        "name": name,
        "isEnabled": is_enabled,
    })
}

/// Wrap rows into the result set of one statement.
#[must_use]
pub fn record_rows(rows: impl IntoIterator<Item = JsonValue>) -> JsonValue {
    JsonValue::Array(rows.into_iter().collect())
}
