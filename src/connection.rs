use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

use crate::config::{ConnectionTarget, Credentials};
use crate::error::SurqlMiddlewareError;
use crate::types::{Bindings, ConnectionEvent, ConnectionStatus};

/// The transport a client drives. One implementation owns one logical connection.
///
/// `execute` receives the full composed text and returns one raw result set per
/// statement that produces a result. Errors from `execute` are surfaced as
/// [`SurqlMiddlewareError::Transport`] and are never retried.
#[async_trait]
pub trait Connection: Send + Sync {
    /// # Errors
    /// Returns an error if the transport cannot open or authenticate.
    async fn connect(
        &self,
        target: &ConnectionTarget,
        credentials: Option<&Credentials>,
    ) -> Result<(), SurqlMiddlewareError>;

    /// # Errors
    /// Returns an error if the transport fails to close cleanly.
    async fn disconnect(&self) -> Result<(), SurqlMiddlewareError>;

    /// Snapshot of the current state; never blocks on the connection.
    fn status(&self) -> ConnectionStatus;

    /// # Errors
    /// Returns `SurqlMiddlewareError::Transport` if the database rejects the query
    /// or the transport fails.
    async fn execute(
        &self,
        text: &str,
        bindings: &Bindings,
    ) -> Result<Vec<JsonValue>, SurqlMiddlewareError>;

    /// A fresh receiver for open/close/error notifications.
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;
}
