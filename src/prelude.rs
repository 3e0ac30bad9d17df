//! Convenient imports for common functionality.
//!
//! This module re-exports the builders, the client, and the types most
//! callers need.

pub use crate::client::SurqlClient;
pub use crate::config::{
    Backoff, ConnectionTarget, Credentials, EngineConfig, EngineOptions, LogPrinter, RetryCount,
};
pub use crate::connection::Connection;
pub use crate::error::SurqlMiddlewareError;
pub use crate::query_builder::{
    FieldValue, IntoQuery, Ordering, Query, QueryKind, count, create, create_record, del_record,
    del_relation, eq, let_value, query, raw, relate_records, select, select_all, time_now,
};
pub use crate::results::{TransactionResults, TxResult};
pub use crate::schema::{Diagnostics, Schema, Validator};
pub use crate::transaction::{TransactionItem, compose};
pub use crate::types::{Bindings, ConnectionEvent, ConnectionStatus, RecordRelation};
