//! Classification-driven retry with exponential backoff and jitter

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::logging::{NoOpLogger, SharedLogger};
use crate::mcp::{McpError, McpResult};
use crate::types::CancellationToken;

/// Jitter applied to each backoff delay, as a fraction of the delay
const JITTER: f64 = 0.25;

/// Server and tool an operation targets, used in log lines and errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryContext {
    pub server: Option<String>,
    pub tool: Option<String>,
}

impl RetryContext {
    pub fn server(server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            tool: None,
        }
    }

    pub fn tool(server: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            tool: Some(tool.into()),
        }
    }
}

impl std::fmt::Display for RetryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.server, &self.tool) {
            (Some(server), Some(tool)) => write!(f, " [server '{}', tool '{}']", server, tool),
            (Some(server), None) => write!(f, " [server '{}']", server),
            (None, Some(tool)) => write!(f, " [tool '{}']", tool),
            (None, None) => Ok(()),
        }
    }
}

/// Retry policy for wire operations
///
/// Each attempt races a per-attempt timeout and the caller's cancellation.
/// Retryable failures (connection, timeout, server) back off for
/// `min(base * 2^attempt * (1 ± 25%), max_delay)`; anything else is returned
/// at once. Cancellation is never retried.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Budget for a single attempt
    pub timeout: Duration,
    logger: SharedLogger,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration, timeout: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
            timeout,
            logger: NoOpLogger::shared(),
        }
    }

    /// General-purpose profile: 3 retries, 1s base, 30s cap, 30s per attempt
    pub fn general() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(30), Duration::from_secs(30))
    }

    /// Connection profile: 5 retries, 2s base, 60s cap, 10s per attempt
    pub fn connection() -> Self {
        Self::new(5, Duration::from_secs(2), Duration::from_secs(60), Duration::from_secs(10))
    }

    /// Tool call profile: 2 retries, 500ms base, 10s cap, 30s per attempt
    pub fn tool_call() -> Self {
        Self::new(2, Duration::from_millis(500), Duration::from_secs(10), Duration::from_secs(30))
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Total attempts this policy makes before giving up
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    fn nominal_delay_secs(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        self.base_delay.as_secs_f64() * 2f64.powi(exponent)
    }

    /// Smallest and largest delay that may follow the given (zero-based) attempt
    pub fn delay_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let nominal = self.nominal_delay_secs(attempt);
        let cap = self.max_delay.as_secs_f64();
        (
            Duration::from_secs_f64((nominal * (1.0 - JITTER)).min(cap)),
            Duration::from_secs_f64((nominal * (1.0 + JITTER)).min(cap)),
        )
    }

    /// Backoff delay after the given (zero-based) attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let jitter = rand::rng().random_range(-JITTER..=JITTER);
        let secs = (self.nominal_delay_secs(attempt) * (1.0 + jitter))
            .min(self.max_delay.as_secs_f64())
            .max(0.0);
        Duration::from_secs_f64(secs)
    }

    /// Run `action` under this policy
    ///
    /// `action` receives the zero-based attempt number. On exhaustion the error
    /// is [`McpError::RetryExhausted`] carrying the total attempts made and the
    /// last failure.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        context: &RetryContext,
        cancel: &CancellationToken,
        mut action: F,
    ) -> McpResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = McpResult<T>>,
    {
        let cancelled = || McpError::cancelled(format!("{}{}", operation, context));
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(cancelled()),
                result = tokio::time::timeout(self.timeout, action(attempt)) => match result {
                    Ok(result) => result,
                    Err(_) => Err(McpError::Timeout(format!(
                        "{}{} exceeded {:?}",
                        operation, context, self.timeout
                    ))),
                },
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        self.logger.info(&format!(
                            "[Retry] {}{} succeeded on attempt {}",
                            operation,
                            context,
                            attempt + 1
                        ));
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if error.is_cancelled() {
                return Err(error);
            }

            if !error.is_retryable() {
                self.logger.debug(&format!(
                    "[Retry] {}{} failed with non-retryable {}: {}",
                    operation,
                    context,
                    error.kind(),
                    error
                ));
                return Err(error);
            }

            if attempt >= self.max_retries {
                self.logger.warn(&format!(
                    "[Retry] {}{} giving up after {} attempts: {}",
                    operation,
                    context,
                    attempt + 1,
                    error
                ));
                return Err(McpError::RetryExhausted {
                    operation: operation.to_string(),
                    attempts: attempt + 1,
                    source: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt);
            self.logger.info(&format!(
                "[Retry] {}{} attempt {}/{} failed ({}), retrying in {:?}",
                operation,
                context,
                attempt + 1,
                self.max_attempts(),
                error.kind(),
                delay
            ));

            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::general()
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::McpErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn counting() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[test]
    fn test_profiles() {
        let general = RetryPolicy::general();
        assert_eq!((general.max_retries, general.base_delay), (3, Duration::from_secs(1)));
        assert_eq!((general.max_delay, general.timeout), (Duration::from_secs(30), Duration::from_secs(30)));

        let connection = RetryPolicy::connection();
        assert_eq!((connection.max_retries, connection.base_delay), (5, Duration::from_secs(2)));
        assert_eq!((connection.max_delay, connection.timeout), (Duration::from_secs(60), Duration::from_secs(10)));

        let tool = RetryPolicy::tool_call();
        assert_eq!((tool.max_retries, tool.base_delay), (2, Duration::from_millis(500)));
        assert_eq!((tool.max_delay, tool.timeout), (Duration::from_secs(10), Duration::from_secs(30)));
    }

    #[test]
    fn test_delay_stays_within_jitter_and_cap() {
        let policy = RetryPolicy::general();
        for attempt in 0..8 {
            let (low, high) = policy.delay_bounds(attempt);
            for _ in 0..50 {
                let delay = policy.delay_for(attempt);
                assert!(delay >= low && delay <= high, "attempt {}: {:?} not in {:?}..{:?}", attempt, delay, low, high);
                assert!(delay <= policy.max_delay);
            }
        }

        assert_eq!(policy.delay_bounds(0), (Duration::from_millis(750), Duration::from_millis(1250)));
        assert_eq!(policy.delay_bounds(10), (Duration::from_secs(30), Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let calls = counting();
        let policy = RetryPolicy::general();
        let result = policy
            .execute("list", &RetryContext::server("a"), &CancellationToken::new(), |_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(McpError::Connection("refused".to_string()))
                    } else {
                        Ok("tools")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "tools");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_last_allowed_attempt() {
        let calls = counting();
        let policy = RetryPolicy::general();
        let result = policy
            .execute("connect", &RetryContext::server("a"), &CancellationToken::new(), |_| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                        Err(McpError::Timeout("slow".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), policy.max_retries + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_is_not_retried() {
        let calls = counting();
        let result: McpResult<()> = RetryPolicy::general()
            .execute("call", &RetryContext::default(), &CancellationToken::new(), |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(McpError::Authentication("bad key".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(McpError::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_total_attempts() {
        let calls = counting();
        let result: McpResult<()> = RetryPolicy::general()
            .execute("call", &RetryContext::tool("a", "search"), &CancellationToken::new(), |attempt| {
                let calls = calls.clone();
                async move {
                    assert_eq!(calls.fetch_add(1, Ordering::SeqCst), attempt);
                    Err(McpError::Server("503".to_string()))
                }
            })
            .await;

        match result {
            Err(McpError::RetryExhausted { attempts, source, .. }) => {
                assert_eq!(attempts, 4);
                assert_eq!(source.kind(), McpErrorKind::ServerError);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_retryable() {
        let calls = counting();
        let policy = RetryPolicy::new(1, Duration::from_millis(100), Duration::from_secs(1), Duration::from_secs(2));
        let result: McpResult<()> = policy
            .execute("call", &RetryContext::default(), &CancellationToken::new(), |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            })
            .await;

        match result {
            Err(McpError::RetryExhausted { attempts, source, .. }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, McpError::Timeout(_)));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_retrying() {
        let calls = counting();
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let policy = RetryPolicy::new(5, Duration::from_secs(10), Duration::from_secs(60), Duration::from_secs(5));
        let result: McpResult<()> = policy
            .execute("connect", &RetryContext::server("slow"), &cancel, |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(McpError::Connection("refused".to_string()))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_cancelled());
        assert!(err.to_string().contains("server 'slow'"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: McpResult<()> = RetryPolicy::general()
            .execute("call", &RetryContext::default(), &cancel, |_| async { Ok(()) })
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
