use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::SurqlMiddlewareError;
use crate::query_builder::QueryKind;
use crate::transaction::{ComposedStatement, ResponseSlot, TransactionItem};

/// The outcome of one transaction item.
#[derive(Debug, Clone, PartialEq)]
pub enum TxResult {
    /// The item produced no row (a `LET` binding).
    None,
    /// Validation was skipped; the driver's value is returned as-is.
    Raw(JsonValue),
    /// Shaped and, if a schema was attached, validated.
    Validated(JsonValue),
}

impl TxResult {
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn value(&self) -> Option<&JsonValue> {
        match self {
            Self::None => None,
            Self::Raw(value) | Self::Validated(value) => Some(value),
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<JsonValue> {
        match self {
            Self::None => None,
            Self::Raw(value) | Self::Validated(value) => Some(value),
        }
    }

    /// Deserialize the value into `T`.
    ///
    /// # Errors
    /// Returns `SurqlMiddlewareError::Usage` for a placeholder and
    /// `SurqlMiddlewareError::Json` when the value does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, SurqlMiddlewareError> {
        let value = self.value().ok_or_else(|| {
            SurqlMiddlewareError::Usage("transaction item produced no value".into())
        })?;
        Ok(T::deserialize(value)?)
    }
}

/// Ordered results, aligned 1:1 with the submitted items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionResults {
    results: Vec<TxResult>,
}

impl TransactionResults {
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TxResult> {
        self.results.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TxResult> {
        self.results.iter()
    }

    /// Deserialize the result at `index` into `T`.
    ///
    /// # Errors
    /// Returns `SurqlMiddlewareError::Usage` for an out-of-range index or a
    /// placeholder, and `SurqlMiddlewareError::Json` on a type mismatch.
    pub fn decode<T: DeserializeOwned>(&self, index: usize) -> Result<T, SurqlMiddlewareError> {
        self.get(index)
            .ok_or_else(|| {
                SurqlMiddlewareError::Usage(format!(
                    "no result at index {index}; transaction had {} item(s)",
                    self.results.len()
                ))
            })?
            .decode()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<TxResult> {
        self.results
    }
}

impl IntoIterator for TransactionResults {
    type Item = TxResult;
    type IntoIter = std::vec::IntoIter<TxResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a TransactionResults {
    type Item = &'a TxResult;
    type IntoIter = std::slice::Iter<'a, TxResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Split the driver's flat response back into per-item results.
///
/// The first failing item aborts the whole call.
///
/// # Errors
/// Returns `ResponseMismatch` when the response length does not match the
/// composed statement, `Shape` for a cardinality mismatch, and `Validation` when a
/// schema rejects a value.
pub fn shape_results(
    composed: &ComposedStatement,
    items: &[TransactionItem],
    response: Vec<JsonValue>,
) -> Result<TransactionResults, SurqlMiddlewareError> {
    let expected = composed.expected_results();
    let actual = response.len();
    if actual != expected {
        return Err(SurqlMiddlewareError::ResponseMismatch { expected, actual });
    }

    let mut response = response.into_iter();
    let mut results = Vec::with_capacity(items.len());
    for (index, (item, slot)) in items.iter().zip(&composed.slots).enumerate() {
        if !slot.expects_result {
            results.push(TxResult::None);
            continue;
        }
        let Some(raw) = response.next() else {
            return Err(SurqlMiddlewareError::ResponseMismatch { expected, actual });
        };
        results.push(shape_one(index, item, slot, raw)?);
    }

    Ok(TransactionResults { results })
}

fn shape_one(
    index: usize,
    item: &TransactionItem,
    slot: &ResponseSlot,
    raw: JsonValue,
) -> Result<TxResult, SurqlMiddlewareError> {
    if !item.validates() {
        return Ok(TxResult::Raw(raw));
    }

    let value = if slot.kind == QueryKind::Count {
        shape_count(index, slot, raw)?
    } else if slot.single {
        unwrap_single(index, slot, raw)?
    } else {
        raw
    };

    let Some(validator) = item.validator_ref() else {
        return Ok(TxResult::Validated(value));
    };

    let validated = match value {
        JsonValue::Array(rows) if !slot.single => {
            let mut out = Vec::with_capacity(rows.len());
            for (row, entry) in rows.into_iter().enumerate() {
                let checked = validator
                    .validate(entry)
                    .map_err(|diagnostics| SurqlMiddlewareError::Validation {
                        index,
                        diagnostics: diagnostics.nested(row),
                    })?;
                out.push(checked);
            }
            JsonValue::Array(out)
        }
        other => validator
            .validate(other)
            .map_err(|diagnostics| SurqlMiddlewareError::Validation { index, diagnostics })?,
    };

    Ok(TxResult::Validated(validated))
}

fn unwrap_single(
    index: usize,
    slot: &ResponseSlot,
    raw: JsonValue,
) -> Result<JsonValue, SurqlMiddlewareError> {
    match raw {
        JsonValue::Array(mut rows) if rows.len() == 1 => Ok(rows.remove(0)),
        JsonValue::Array(rows) if rows.is_empty() && slot.kind.tolerates_empty() => {
            Ok(JsonValue::Null)
        }
        JsonValue::Array(rows) => Err(shape_error(index, format!("{} rows", rows.len()))),
        other => Err(shape_error(index, describe(&other))),
    }
}

/// `[{ "count": n }]` becomes `n` (or a sequence of counts when not single).
fn shape_count(
    index: usize,
    slot: &ResponseSlot,
    raw: JsonValue,
) -> Result<JsonValue, SurqlMiddlewareError> {
    let rows = match raw {
        JsonValue::Array(rows) => rows,
        other => return Err(shape_error(index, describe(&other))),
    };
    let mut counts = Vec::with_capacity(rows.len());
    for row in rows {
        match row.get("count") {
            Some(n) if n.is_u64() || n.is_i64() => counts.push(n.clone()),
            _ => {
                return Err(SurqlMiddlewareError::Shape {
                    index,
                    expected: "a row with an integer `count`".into(),
                    actual: row.to_string(),
                });
            }
        }
    }
    if !slot.single {
        return Ok(JsonValue::Array(counts));
    }
    match counts.len() {
        0 => Ok(JsonValue::from(0)),
        1 => Ok(counts.remove(0)),
        n => Err(shape_error(index, format!("{n} rows"))),
    }
}

fn shape_error(index: usize, actual: String) -> SurqlMiddlewareError {
    SurqlMiddlewareError::Shape {
        index,
        expected: "exactly one row".into(),
        actual,
    }
}

fn describe(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".into(),
        JsonValue::Bool(_) => "a boolean".into(),
        JsonValue::Number(_) => "a number".into(),
        JsonValue::String(_) => "a string".into(),
        JsonValue::Array(rows) => format!("{} rows", rows.len()),
        JsonValue::Object(_) => "an object".into(),
    }
}
