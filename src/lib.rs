//! Compose, validate, and execute atomic multi-statement SurrealQL transactions.
//!
//! Build descriptors with the [`query_builder`] functions, wrap them in
//! [`TransactionItem`]s, and hand them to [`SurqlClient::run_transaction`]. The
//! client merges them into one `BEGIN ... COMMIT` statement, waits for the
//! connection to be ready, sends it, and shapes and validates each item's
//! slice of the response.
//!
//! ```rust
//! use surql_middleware::prelude::*;
//!
//! let items = [
//!     TransactionItem::new(let_value("orgs", select(&["name"]).from("organisation"))),
//!     TransactionItem::new(select_all().from("$orgs")),
//! ];
//! let composed = compose(&items)?;
//! assert!(composed.text.contains("SELECT * FROM $orgs"));
//! assert_eq!(composed.expected_results(), 1);
//! # Ok::<(), SurqlMiddlewareError>(())
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod prelude;
pub mod query_builder;
pub mod readiness;
pub mod results;
pub mod schema;
pub mod transaction;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::SurqlClient;
pub use config::{
    Backoff, ConnectionTarget, Credentials, EngineConfig, EngineOptions, EngineOptionsBuilder,
    LogPrinter, RetryCount,
};
pub use connection::Connection;
pub use error::SurqlMiddlewareError;
pub use results::{TransactionResults, TxResult};
pub use schema::{Diagnostics, Schema, Validator};
pub use transaction::{ComposedStatement, TransactionItem, compose};
pub use types::{Bindings, ConnectionEvent, ConnectionStatus, RecordRelation};
