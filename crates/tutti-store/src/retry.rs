//! Transient error retry for the libSQL store.
//!
//! A local database file shared between several `tutti` processes can
//! report `SQLITE_BUSY` while another writer holds the lock. Those errors
//! clear on their own, so store calls are retried with exponential backoff.
//! Anything else is returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// Configuration for retry behavior on transient store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Detect lock contention errors that resolve without intervention.
///
/// Kept narrow so genuine SQL or constraint errors are never retried.
#[must_use]
pub fn is_transient_store_error(e: &StoreError) -> bool {
    let StoreError::LibSql(inner) = e else {
        return false;
    };
    let msg = inner.to_string();
    msg.contains("database is locked")
        || msg.contains("SQLITE_BUSY")
        || msg.contains("unable to acquire shared lock")
}

/// Run `op`, retrying transient failures according to `config`.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-transient error.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < config.max_attempts && is_transient_store_error(&error) => {
                let delay = config.delay_for(attempt);
                tracing::warn!(
                    %error,
                    operation,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "transient store error, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
        assert_eq!(config.delay_for(10), Duration::from_secs(2));
    }

    #[test]
    fn only_libsql_errors_can_be_transient() {
        assert!(!is_transient_store_error(&StoreError::Query(
            "database is locked".into()
        )));
        assert!(!is_transient_store_error(&StoreError::NotFound {
            path: "/theory/x".into()
        }));
    }

    #[tokio::test]
    async fn non_transient_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), StoreError> =
            with_retry(&RetryConfig::default(), "test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::InvalidUpdate("nope".into()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_returns_value() {
        let value = with_retry(&RetryConfig::default(), "test", || async {
            Ok::<_, StoreError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
