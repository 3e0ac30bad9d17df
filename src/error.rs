use thiserror::Error;

use crate::schema::Diagnostics;

/// Every failure a transaction call can report.
///
/// `Usage`, `ConnectionUnavailable`, and `Cancelled` are raised before anything
/// is sent. `ResponseMismatch`, `Shape`, and `Validation` are raised after the
/// database has already committed the transaction; they fail the call but do
/// not undo the writes.
#[derive(Debug, Error)]
pub enum SurqlMiddlewareError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Connection unavailable after {attempts} attempt(s)")]
    ConnectionUnavailable { attempts: u32 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Response mismatch: expected {expected} result set(s) from the driver, got {actual}")]
    ResponseMismatch { expected: usize, actual: usize },

    #[error("Shape error in item {index}: expected {expected}, got {actual}")]
    Shape {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("Validation error in item {index}: {diagnostics}")]
    Validation {
        index: usize,
        diagnostics: Diagnostics,
    },

    #[error("Cancelled while waiting for the connection after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SurqlMiddlewareError {
    /// Index of the transaction item this error belongs to, if any.
    #[must_use]
    pub fn item_index(&self) -> Option<usize> {
        match self {
            Self::Shape { index, .. } | Self::Validation { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Whether the failure was detected after the transaction was sent.
    ///
    /// When true the database may already hold the committed writes.
    #[must_use]
    pub fn is_post_commit(&self) -> bool {
        matches!(
            self,
            Self::ResponseMismatch { .. } | Self::Shape { .. } | Self::Validation { .. }
        )
    }
}
