//! Readiness gate and retry policy.
//!
//! Before a composed statement is sent the gate polls the transport status.
//! Only `Connected` lets the call proceed; anything else is retried according to
//! [`RetryCount`] with a [`Backoff`] delay between polls. Retry state lives in
//! the call, never in the client.

use tokio_util::sync::CancellationToken;

use crate::config::{Backoff, RetryCount};
use crate::connection::Connection;
use crate::error::SurqlMiddlewareError;

/// Past this many polls each further failure is logged at `warn`.
const WARN_AFTER_ATTEMPTS: u32 = 5;

/// Where a single gated call currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Retrying { attempts: u32 },
    Sent { attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Retry settings copied from the client options for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retry_count: RetryCount,
    pub retry_delay: Backoff,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(retry_count: RetryCount, retry_delay: Backoff) -> Self {
        Self {
            retry_count,
            retry_delay,
        }
    }

    /// Poll `conn` until it is ready, retries run out, or `cancel` fires.
    ///
    /// Returns the number of status polls made. The status is read once per
    /// attempt and the gate stops polling as soon as it sees `Connected`.
    ///
    /// # Errors
    /// Returns `ConnectionUnavailable` when retries are exhausted and
    /// `Cancelled` when `cancel` fires during a retry delay.
    pub async fn await_ready<C>(
        &self,
        conn: &C,
        cancel: Option<&CancellationToken>,
    ) -> Result<u32, SurqlMiddlewareError>
    where
        C: Connection + ?Sized,
    {
        let mut state = GateState::Pending;
        let mut remaining = match self.retry_count {
            RetryCount::Limited(n) => Some(n),
            RetryCount::Unbounded => None,
        };
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let status = conn.status();
            tracing::debug!(attempt = attempts, %status, ?state, "readiness poll");

            if status.is_ready() {
                state = GateState::Sent { attempts };
                tracing::debug!(?state, "connection ready");
                return Ok(attempts);
            }

            match remaining.as_mut() {
                Some(0) => {
                    state = GateState::Exhausted { attempts };
                    tracing::warn!(?state, %status, "connection not ready; retries exhausted");
                    return Err(SurqlMiddlewareError::ConnectionUnavailable { attempts });
                }
                Some(n) => *n -= 1,
                None => {}
            }
            state = GateState::Retrying { attempts };
            if attempts > WARN_AFTER_ATTEMPTS {
                tracing::warn!(attempts, %status, "connection still not ready, retrying");
            }

            let delay = self.retry_delay.delay(attempts);
            match cancel {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => {
                            tracing::debug!(attempts, "readiness wait cancelled");
                            return Err(SurqlMiddlewareError::Cancelled { attempts });
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }
    }
}
