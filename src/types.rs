use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Named parameters sent alongside a query.
///
/// A `BTreeMap` keeps the order stable, so logged output and composed
/// bindings are deterministic.
pub type Bindings = BTreeMap<String, JsonValue>;

/// Connection state as reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// Only a connected transport may receive a query.
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Notifications pushed by the transport and re-emitted by the client unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection was opened.
    Opened,
    /// The connection was closed.
    Closed,
    /// The connection reported an error.
    Errored(String),
}

/// Two records joined by an edge table, e.g. `person:john->knows->person:david`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRelation {
    pub from_table: String,
    pub from_id: String,
    pub edge: String,
    pub to_table: String,
    pub to_id: String,
}

impl RecordRelation {
    #[must_use]
    pub fn new(
        from: (impl Into<String>, impl Into<String>),
        edge: impl Into<String>,
        to: (impl Into<String>, impl Into<String>),
    ) -> Self {
        Self {
            from_table: from.0.into(),
            from_id: from.1.into(),
            edge: edge.into(),
            to_table: to.0.into(),
            to_id: to.1.into(),
        }
    }
}
