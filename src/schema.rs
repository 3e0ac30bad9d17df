//! Per-item result validation.
//!
//! A [`Validator`] turns a raw JSON value into a validated (possibly coerced)
//! value or reports [`Diagnostics`]. The transaction engine only depends on the
//! trait; [`Schema`] provides serde-backed and closure-backed implementations.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// One problem found while validating a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// JSON-pointer-like location, empty for the root.
    pub path: String,
    pub message: String,
}

/// Everything a validator rejected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub issues: Vec<Issue>,
}

impl Diagnostics {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self::at("", message)
    }

    #[must_use]
    pub fn at(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// Prefix every issue path with `segment`.
    #[must_use]
    pub fn nested(mut self, segment: impl fmt::Display) -> Self {
        for issue in &mut self.issues {
            issue.path = if issue.path.is_empty() {
                format!("/{segment}")
            } else {
                format!("/{segment}{}", issue.path)
            };
        }
        self
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            if issue.path.is_empty() {
                write!(f, "{}", issue.message)?;
            } else {
                write!(f, "{}: {}", issue.path, issue.message)?;
            }
        }
        Ok(())
    }
}

/// Validates one raw value.
pub trait Validator: Send + Sync {
    /// # Errors
    /// Returns `Diagnostics` describing why `value` was rejected.
    fn validate(&self, value: JsonValue) -> Result<JsonValue, Diagnostics>;
}

impl<F> Validator for F
where
    F: Fn(JsonValue) -> Result<JsonValue, Diagnostics> + Send + Sync,
{
    fn validate(&self, value: JsonValue) -> Result<JsonValue, Diagnostics> {
        self(value)
    }
}

/// Shared, type-erased validator attached to a transaction item.
pub type SharedValidator = Arc<dyn Validator>;

/// Validates by round-tripping through `T`: deserialize, then serialize back.
///
/// Unknown fields are dropped and serde defaults applied, so the output is
/// the coerced shape of `T`.
pub struct Typed<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Validator for Typed<T>
where
    T: DeserializeOwned + Serialize,
{
    fn validate(&self, value: JsonValue) -> Result<JsonValue, Diagnostics> {
        let typed: T = serde_json::from_value(value).map_err(|e| Diagnostics::new(e.to_string()))?;
        serde_json::to_value(typed).map_err(|e| Diagnostics::new(e.to_string()))
    }
}

struct AnyValue;

impl Validator for AnyValue {
    fn validate(&self, value: JsonValue) -> Result<JsonValue, Diagnostics> {
        Ok(value)
    }
}

struct Refined {
    inner: SharedValidator,
    check: Box<dyn Fn(&JsonValue) -> bool + Send + Sync>,
    message: String,
}

impl Validator for Refined {
    fn validate(&self, value: JsonValue) -> Result<JsonValue, Diagnostics> {
        let value = self.inner.validate(value)?;
        if (self.check)(&value) {
            Ok(value)
        } else {
            Err(Diagnostics::new(self.message.clone()))
        }
    }
}

/// Constructors for common validators.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
/// use surql_middleware::schema::{Schema, Validator};
///
/// #[derive(Serialize, Deserialize)]
/// struct Organisation { name: String, #[serde(rename = "isEnabled")] is_enabled: bool }
///
/// let schema = Schema::typed::<Organisation>()
///     .refine(|v| v["name"].as_str().is_some_and(|n| !n.is_empty()), "name must not be empty");
/// assert!(schema.validate(json!({"name": "Test", "isEnabled": true})).is_ok());
/// assert!(schema.validate(json!({"name": "", "isEnabled": true})).is_err());
/// ```
#[derive(Clone)]
pub struct Schema {
    inner: SharedValidator,
}

impl Schema {
    /// Values must deserialize into `T`.
    #[must_use]
    pub fn typed<T>() -> Self
    where
        T: DeserializeOwned + Serialize + 'static,
    {
        Self::from_validator(Typed::<T> {
            _marker: PhantomData,
        })
    }

    /// Accept every value unchanged.
    #[must_use]
    pub fn any() -> Self {
        Self::from_validator(AnyValue)
    }

    #[must_use]
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(JsonValue) -> Result<JsonValue, Diagnostics> + Send + Sync + 'static,
    {
        Self::from_validator(f)
    }

    #[must_use]
    pub fn from_validator(validator: impl Validator + 'static) -> Self {
        Self {
            inner: Arc::new(validator),
        }
    }

    /// Additionally require `check` to hold on the validated value.
    #[must_use]
    pub fn refine<F>(self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&JsonValue) -> bool + Send + Sync + 'static,
    {
        Self::from_validator(Refined {
            inner: self.inner,
            check: Box::new(check),
            message: message.into(),
        })
    }

    #[must_use]
    pub fn into_shared(self) -> SharedValidator {
        self.inner
    }
}

impl Validator for Schema {
    fn validate(&self, value: JsonValue) -> Result<JsonValue, Diagnostics> {
        self.inner.validate(value)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").finish_non_exhaustive()
    }
}
