use serde_json::Value as JsonValue;

/// Literal query syntax emitted as-is instead of being bound as a parameter.
///
/// ```rust
/// use surql_middleware::prelude::*;
///
/// let q = create("organisation").set("createdAt", time_now()).into_query();
/// assert!(q.text().contains("createdAt = time::now()"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Raw(String);

impl Raw {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mark `expr` as a raw expression.
#[must_use]
pub fn raw(expr: impl Into<String>) -> Raw {
    Raw(expr.into())
}

/// Alias of [`raw`], reads naturally in field maps: `("createdAt", eq(time_now()))`.
#[must_use]
pub fn eq(expr: impl Into<Raw>) -> Raw {
    expr.into()
}

/// The server-side current time.
#[must_use]
pub fn time_now() -> Raw {
    raw("time::now()")
}

impl From<&str> for Raw {
    fn from(value: &str) -> Self {
        raw(value)
    }
}

impl From<String> for Raw {
    fn from(value: String) -> Self {
        Raw(value)
    }
}

/// A value assigned to a field or compared in a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Bound as a named parameter.
    Value(JsonValue),
    /// Emitted verbatim.
    Raw(Raw),
}

impl From<Raw> for FieldValue {
    fn from(value: Raw) -> Self {
        Self::Raw(value)
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        Self::Value(value)
    }
}

impl From<&JsonValue> for FieldValue {
    fn from(value: &JsonValue) -> Self {
        Self::Value(value.clone())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Value(JsonValue::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Value(JsonValue::String(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Value(JsonValue::Bool(value))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Value(value.into())
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Value(value.into())
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Value(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Value(value.into())
    }
}
