use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{EngineConfig, EngineOptions};
use crate::connection::Connection;
use crate::error::SurqlMiddlewareError;
use crate::readiness::RetryPolicy;
use crate::results::{TransactionResults, TxResult, shape_results};
use crate::transaction::{ComposedStatement, TransactionItem, compose};
use crate::types::{ConnectionEvent, ConnectionStatus};

/// Composes, gates, sends, and validates transactions over one connection.
///
/// # Examples
/// ```rust,no_run
/// use serde::{Deserialize, Serialize};
/// use surql_middleware::prelude::*;
/// use surql_middleware::test_utils::MockConnection;
///
/// #[derive(Serialize, Deserialize)]
/// struct Organisation { id: String, name: String }
///
/// # async fn demo() -> Result<(), SurqlMiddlewareError> {
/// let config = EngineConfig::new(ConnectionTarget::new("test", "test", "http://localhost:8000"))
///     .with_credentials(Credentials::new("root", "root"));
/// let client = SurqlClient::new(MockConnection::connected(), config);
///
/// let results = client
///     .run_transaction([
///         TransactionItem::new(create("organisation").set("name", "Test"))
///             .schema(Schema::typed::<Organisation>()),
///         TransactionItem::new(count("organisation")),
///     ])
///     .await?;
/// let total: u64 = results.decode(1)?;
/// # let _ = total;
/// # Ok(()) }
/// ```
pub struct SurqlClient<C: Connection> {
    conn: Arc<C>,
    config: EngineConfig,
}

impl<C: Connection + 'static> SurqlClient<C> {
    #[must_use]
    pub fn new(conn: C, config: EngineConfig) -> Self {
        Self::from_arc(Arc::new(conn), config)
    }

    /// Build a client over a transport that is shared elsewhere.
    #[must_use]
    pub fn from_arc(conn: Arc<C>, config: EngineConfig) -> Self {
        Self { conn, config }
    }

    /// The underlying transport.
    #[must_use]
    pub fn handle(&self) -> &Arc<C> {
        &self.conn
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.config.options
    }

    /// Open the connection with the configured target and credentials.
    ///
    /// # Errors
    /// Propagates the transport's connection error.
    pub async fn connect(&self) -> Result<(), SurqlMiddlewareError> {
        tracing::debug!(endpoint = %self.config.target.endpoint, "connecting");
        self.conn
            .connect(&self.config.target, self.config.credentials.as_ref())
            .await
    }

    /// # Errors
    /// Propagates the transport's disconnect error.
    pub async fn disconnect(&self) -> Result<(), SurqlMiddlewareError> {
        self.conn.disconnect().await
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.conn.status()
    }

    /// Receive the transport's open/close/error notifications unchanged.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.conn.subscribe()
    }

    /// Invoke `callback` for every notification until the transport drops its sender.
    ///
    /// Must be called from within a tokio runtime. Abort the returned handle to
    /// unregister.
    pub fn on_event<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(ConnectionEvent) + Send + 'static,
    {
        let mut events = self.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Compose `items` without sending them.
    ///
    /// # Errors
    /// Returns `SurqlMiddlewareError::Usage` if the items cannot be composed.
    pub fn compose<I>(&self, items: I) -> Result<ComposedStatement, SurqlMiddlewareError>
    where
        I: IntoIterator,
        I::Item: Into<TransactionItem>,
    {
        let items: Vec<TransactionItem> = items.into_iter().map(Into::into).collect();
        compose(&items)
    }

    /// Run `items` as one atomic transaction.
    ///
    /// Results are aligned with `items`; `LET` items map to [`TxResult::None`].
    /// A `ResponseMismatch`, `Shape`, or `Validation` error means the database has already
    /// committed the transaction.
    ///
    /// # Errors
    /// Fails on composition errors, retry exhaustion, transport errors, or the
    /// first item that does not pass shaping or validation.
    pub async fn run_transaction<I>(
        &self,
        items: I,
    ) -> Result<TransactionResults, SurqlMiddlewareError>
    where
        I: IntoIterator,
        I::Item: Into<TransactionItem>,
    {
        self.execute(items.into_iter().map(Into::into).collect(), None)
            .await
    }

    /// Like [`run_transaction`](Self::run_transaction), aborting with
    /// `Cancelled` if `cancel` fires while waiting for the connection.
    ///
    /// # Errors
    /// As `run_transaction`, plus `SurqlMiddlewareError::Cancelled`.
    pub async fn run_transaction_with_cancel<I>(
        &self,
        items: I,
        cancel: &CancellationToken,
    ) -> Result<TransactionResults, SurqlMiddlewareError>
    where
        I: IntoIterator,
        I::Item: Into<TransactionItem>,
    {
        self.execute(items.into_iter().map(Into::into).collect(), Some(cancel))
            .await
    }

    /// A one-item transaction.
    ///
    /// # Errors
    /// As [`run_transaction`](Self::run_transaction).
    pub async fn run_single(
        &self,
        item: impl Into<TransactionItem>,
    ) -> Result<TxResult, SurqlMiddlewareError> {
        let results = self.execute(vec![item.into()], None).await?;
        Ok(results.into_iter().next().unwrap_or(TxResult::None))
    }

    /// A one-item transaction whose result is deserialized into `T`.
    ///
    /// # Errors
    /// As [`run_transaction`](Self::run_transaction), plus
    /// `SurqlMiddlewareError::Json` if the value does not fit `T`.
    pub async fn run_single_as<T: DeserializeOwned>(
        &self,
        item: impl Into<TransactionItem>,
    ) -> Result<T, SurqlMiddlewareError> {
        self.run_single(item).await?.decode()
    }

    async fn execute(
        &self,
        items: Vec<TransactionItem>,
        cancel: Option<&CancellationToken>,
    ) -> Result<TransactionResults, SurqlMiddlewareError> {
        let composed = compose(&items)?;

        let options = &self.config.options;
        let policy = RetryPolicy::new(options.retry_count, options.retry_delay);
        let attempts = policy.await_ready(self.conn.as_ref(), cancel).await?;

        if options.logging {
            options.log_printer.print(&composed.text, &composed.bindings);
        }
        tracing::debug!(
            items = composed.item_count,
            expected_results = composed.expected_results(),
            attempts,
            "dispatching transaction"
        );

        let response = self.conn.execute(&composed.text, &composed.bindings).await?;
        shape_results(&composed, &items, response)
    }
}

impl<C: Connection> std::fmt::Debug for SurqlClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurqlClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
