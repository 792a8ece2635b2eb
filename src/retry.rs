//! Retry policy for provider requests.
//!
//! Rate limits and server or transport failures are retried with a
//! doubling delay; any other provider answer fails on the first attempt.

use crate::openai::ProviderError;
use anyhow::Result;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Attempts and delays for one provider request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, the first one included; 0 behaves like 1
    pub max_attempts: u32,
    /// Wait before the second attempt, doubled for each later one
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay: Duration::from_secs(5),
        }
    }

    /// 3 attempts, waiting 1s then 2s
    pub fn provider_call() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before attempt `attempt` (0-based)
    fn backoff(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            n => self
                .initial_delay
                .saturating_mul(1 << (n - 1).min(16))
                .min(self.max_delay),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::provider_call()
    }
}

/// Whether a failed provider request is worth repeating.
///
/// 429 and 5xx statuses and anything that is not a [`ProviderError`]
/// (connection, timeout, body decoding) are transient.
pub fn is_transient(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ProviderError>() {
        Some(ProviderError::Status { status, .. }) => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        Some(ProviderError::NoChoices) => false,
        None => true,
    }
}

/// Run `request` until it succeeds, fails with a non-transient error, or
/// runs out of attempts. The last error is returned.
pub async fn retry_provider_call<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut request: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let wait = config.backoff(attempt);
        if !wait.is_zero() {
            debug!("{}: waiting {:?} before attempt {}/{}", label, wait, attempt + 1, attempts);
            sleep(wait).await;
        }

        let error = match request().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        attempt += 1;
        if !is_transient(&error) {
            debug!("{}: {:#}, not retrying", label, error);
            return Err(error);
        }
        if attempt >= attempts {
            warn!("{}: giving up after {} attempts: {:#}", label, attempts, error);
            return Err(error);
        }
        warn!("{}: attempt {}/{} failed: {:#}", label, attempt, attempts, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn status(code: StatusCode) -> anyhow::Error {
        ProviderError::Status {
            status: code,
            body: String::new(),
        }
        .into()
    }

    /// Fails with `errors` in order, then answers "ok"
    async fn scripted(
        config: &RetryConfig,
        errors: Vec<anyhow::Error>,
    ) -> (Result<&'static str>, u32) {
        let calls = AtomicU32::new(0);
        let pending = Mutex::new(VecDeque::from(errors));
        let result = retry_provider_call(config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            let outcome = pending.lock().unwrap().pop_front();
            async move {
                match outcome {
                    Some(error) => Err(error),
                    None => Ok("ok"),
                }
            }
        })
        .await;
        (result, calls.load(Ordering::SeqCst))
    }

    fn fast(attempts: u32) -> RetryConfig {
        RetryConfig::new(attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_provider_call_schedule() {
        let config = RetryConfig::provider_call();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff(0), Duration::ZERO);
        assert_eq!(config.backoff(1), Duration::from_secs(1));
        assert_eq!(config.backoff(2), Duration::from_secs(2));
        assert_eq!(config.backoff(4), Duration::from_secs(5));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&status(StatusCode::TOO_MANY_REQUESTS)));
        assert!(is_transient(&status(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(!is_transient(&status(StatusCode::UNAUTHORIZED)));
        assert!(!is_transient(&status(StatusCode::BAD_REQUEST)));
        assert!(!is_transient(&ProviderError::NoChoices.into()));
        assert!(is_transient(&anyhow::anyhow!("connection reset")));
    }

    #[tokio::test]
    async fn test_rate_limit_then_success() {
        let (result, calls) = scripted(
            &fast(3),
            vec![status(StatusCode::TOO_MANY_REQUESTS), status(StatusCode::BAD_GATEWAY)],
        )
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_client_error_fails_immediately() {
        let (result, calls) = scripted(&fast(3), vec![status(StatusCode::FORBIDDEN)]).await;

        assert!(result.unwrap_err().to_string().contains("403"));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_empty_choices_fail_immediately() {
        let (result, calls) = scripted(&fast(3), vec![ProviderError::NoChoices.into()]).await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_persistent_outage_exhausts_attempts() {
        let down = (0..3).map(|_| status(StatusCode::INTERNAL_SERVER_ERROR)).collect();
        let (result, calls) = scripted(&fast(2), down).await;

        assert!(result.unwrap_err().to_string().contains("500"));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_single_attempt_never_retries() {
        let (result, calls) = scripted(
            &RetryConfig::single_attempt(),
            vec![anyhow::anyhow!("timed out")],
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_sends_once() {
        let (result, calls) = scripted(&RetryConfig::new(0, Duration::ZERO), vec![]).await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls, 1);
    }
}
