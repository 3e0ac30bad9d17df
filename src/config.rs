use std::fmt;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SurqlMiddlewareError;
use crate::types::Bindings;

/// Where to connect: namespace, database, and endpoint URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionTarget {
    pub namespace: String,
    pub database: String,
    pub endpoint: String,
}

impl ConnectionTarget {
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        database: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            database: database.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Sign-in credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    #[must_use]
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

// Keep passwords out of debug output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// How many times the readiness gate re-polls a connection that is not ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryCount {
    Limited(u32),
    Unbounded,
}

impl RetryCount {
    /// Accept the conventional integer form, where `-1` means unbounded.
    ///
    /// # Errors
    /// Returns `SurqlMiddlewareError::ConfigError` for negative values other than `-1`
    /// and for values above `u32::MAX`.
    pub fn from_i64(value: i64) -> Result<Self, SurqlMiddlewareError> {
        match value {
            -1 => Ok(Self::Unbounded),
            v if v < 0 => Err(SurqlMiddlewareError::ConfigError(format!(
                "retry count must be -1 or non-negative, got {v}"
            ))),
            v => u32::try_from(v).map(Self::Limited).map_err(|_| {
                SurqlMiddlewareError::ConfigError(format!("retry count {v} is too large"))
            }),
        }
    }
}

impl Default for RetryCount {
    fn default() -> Self {
        Self::Limited(10)
    }
}

/// Delay between readiness polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential {
        initial: Duration,
        max: Duration,
        factor: f64,
    },
}

impl Backoff {
    /// Delay after the `attempt`-th failed poll (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                max,
                factor,
            } => {
                let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
                let scaled = initial.as_secs_f64() * factor.max(1.0).powi(exponent);
                if scaled.is_finite() && scaled < max.as_secs_f64() {
                    Duration::from_secs_f64(scaled)
                } else {
                    max
                }
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(1))
    }
}

type PrinterFn = dyn Fn(&str, &Bindings) + Send + Sync;

/// Sink receiving each composed statement right before it is sent.
#[derive(Clone)]
pub struct LogPrinter(Arc<PrinterFn>);

impl LogPrinter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &Bindings) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Write the statement to standard output with a timestamp.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(|text, _bindings| {
            let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "[{now}] {text}");
        })
    }

    /// Emit the statement and its bindings as a `tracing` event.
    #[must_use]
    pub fn tracing() -> Self {
        Self::new(|text, bindings| {
            tracing::info!(target: "surql_middleware::query", query = text, ?bindings, "dispatch");
        })
    }

    pub fn print(&self, text: &str, bindings: &Bindings) {
        (self.0)(text, bindings);
    }
}

impl Default for LogPrinter {
    fn default() -> Self {
        Self::stdout()
    }
}

impl fmt::Debug for LogPrinter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogPrinter(..)")
    }
}

/// Per-client options, fixed once the client is built.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Forward every composed statement to `log_printer` before sending it.
    pub logging: bool,
    pub log_printer: LogPrinter,
    pub retry_count: RetryCount,
    pub retry_delay: Backoff,
}

impl EngineOptions {
    #[must_use]
    pub fn builder() -> EngineOptionsBuilder {
        EngineOptionsBuilder::default()
    }
}

/// Fluent builder for [`EngineOptions`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct EngineOptionsBuilder {
    opts: EngineOptions,
}

impl EngineOptionsBuilder {
    #[must_use]
    pub fn logging(mut self, logging: bool) -> Self {
        self.opts.logging = logging;
        self
    }

    #[must_use]
    pub fn log_printer(mut self, printer: LogPrinter) -> Self {
        self.opts.log_printer = printer;
        self
    }

    #[must_use]
    pub fn retry_count(mut self, retry_count: RetryCount) -> Self {
        self.opts.retry_count = retry_count;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, retry_delay: Backoff) -> Self {
        self.opts.retry_delay = retry_delay;
        self
    }

    #[must_use]
    pub fn finish(self) -> EngineOptions {
        self.opts
    }
}

/// Everything needed to build a client.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub target: ConnectionTarget,
    pub credentials: Option<Credentials>,
    pub options: EngineOptions,
}

impl EngineConfig {
    #[must_use]
    pub fn new(target: ConnectionTarget) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_count_from_integer_form() {
        assert_eq!(RetryCount::from_i64(-1).unwrap(), RetryCount::Unbounded);
        assert_eq!(RetryCount::from_i64(0).unwrap(), RetryCount::Limited(0));
        assert_eq!(RetryCount::from_i64(3).unwrap(), RetryCount::Limited(3));
        assert!(RetryCount::from_i64(-2).is_err());
        assert!(RetryCount::from_i64(i64::MAX).is_err());
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            initial: Duration::from_millis(50),
            max: Duration::from_secs(1),
            factor: 2.0,
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(50));
        assert_eq!(backoff.delay(2), Duration::from_millis(100));
        assert_eq!(backoff.delay(3), Duration::from_millis(200));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn builder_overrides_only_what_is_set() {
        let opts = EngineOptions::builder().logging(true).finish();
        assert!(opts.logging);
        assert_eq!(opts.retry_count, RetryCount::default());
        assert_eq!(opts.retry_delay, Backoff::default());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("root", "secret");
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
