//! In-memory transport for tests and downstream users.
//!
//! [`MockConnection`] follows a scripted sequence of statuses, returns queued
//! responses, and records every statement it was asked to execute.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio::sync::broadcast;

use crate::config::{ConnectionTarget, Credentials};
use crate::connection::Connection;
use crate::error::SurqlMiddlewareError;
use crate::types::{Bindings, ConnectionEvent, ConnectionStatus};

pub mod test_helpers;

pub use test_helpers::{organisation_row, record_rows};

/// A statement received by [`MockConnection::execute`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub text: String,
    pub bindings: Bindings,
}

#[derive(Debug, Default)]
struct MockState {
    status: ConnectionStatus,
    scripted: VecDeque<ConnectionStatus>,
    responses: VecDeque<Result<Vec<JsonValue>, String>>,
    executed: Vec<ExecutedQuery>,
    connected_to: Option<ConnectionTarget>,
}

/// Scripted [`Connection`] implementation.
#[derive(Debug)]
pub struct MockConnection {
    state: Mutex<MockState>,
    polls: AtomicU32,
    events: broadcast::Sender<ConnectionEvent>,
}

impl MockConnection {
    /// A mock whose status is `status` once any scripted statuses are used up.
    #[must_use]
    pub fn new(status: ConnectionStatus) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            state: Mutex::new(MockState {
                status,
                ..MockState::default()
            }),
            polls: AtomicU32::new(0),
            events,
        }
    }

    #[must_use]
    pub fn connected() -> Self {
        Self::new(ConnectionStatus::Connected)
    }

    /// Statuses returned by the next polls, in order, before the steady status.
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = ConnectionStatus>) {
        self.lock().scripted.extend(statuses);
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        self.lock().status = status;
    }

    /// Queue the raw result sets returned by the next `execute`.
    pub fn push_response(&self, response: Vec<JsonValue>) {
        self.lock().responses.push_back(Ok(response));
    }

    /// Make the next `execute` fail with a transport error.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock().responses.push_back(Err(message.into()));
    }

    /// Push a notification as the transport would.
    pub fn emit(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    #[must_use]
    pub fn status_polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.lock().executed.clone()
    }

    #[must_use]
    pub fn connected_to(&self) -> Option<ConnectionTarget> {
        self.lock().connected_to.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn connect(
        &self,
        target: &ConnectionTarget,
        credentials: Option<&Credentials>,
    ) -> Result<(), SurqlMiddlewareError> {
        if target.endpoint.is_empty() {
            return Err(SurqlMiddlewareError::Transport("endpoint is empty".into()));
        }
        if credentials.is_some_and(|c| c.user.is_empty()) {
            return Err(SurqlMiddlewareError::Transport("sign-in rejected".into()));
        }
        {
            let mut state = self.lock();
            state.status = ConnectionStatus::Connected;
            state.connected_to = Some(target.clone());
        }
        self.emit(ConnectionEvent::Opened);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), SurqlMiddlewareError> {
        self.lock().status = ConnectionStatus::Disconnected;
        self.emit(ConnectionEvent::Closed);
        Ok(())
    }

    fn status(&self) -> ConnectionStatus {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        match state.scripted.pop_front() {
            Some(status) => status,
            None => state.status,
        }
    }

    async fn execute(
        &self,
        text: &str,
        bindings: &Bindings,
    ) -> Result<Vec<JsonValue>, SurqlMiddlewareError> {
        let mut state = self.lock();
        state.executed.push(ExecutedQuery {
            text: text.to_string(),
            bindings: bindings.clone(),
        });
        match state.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(SurqlMiddlewareError::Transport(message)),
            None => Err(SurqlMiddlewareError::Transport(
                "mock connection has no queued response".into(),
            )),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}
