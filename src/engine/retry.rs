// src/engine/retry.rs — Retry with exponential backoff for engines
//
// Wraps any Engine with automatic retry on transient failures.
// Retries: rate limits (429), server errors (5xx), timeouts, quota errors.
// Does NOT retry: capability errors, bad requests, configuration errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Engine, EngineResponse};
use crate::infra::errors::CitemeterError;

// Two retries after the initial call: three attempts total.
const MAX_RETRIES: u32 = 2;
const INITIAL_DELAY_MS: u64 = 2_000;
const BACKOFF_FACTOR: f64 = 2.0;
const MAX_DELAY_MS: u64 = 30_000;
const JITTER_FRACTION: f64 = 0.2;

/// Message fragments that mark an error as transient even when the adapter
/// could not classify it structurally. Providers bury quota failures in
/// free-text messages with no reliable error code.
const TRANSIENT_TOKENS: &[&str] = &["rate", "quota", "429", "resource exhausted", "exceeded"];

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
    pub jitter_fraction: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_delay: Duration::from_millis(INITIAL_DELAY_MS),
            backoff_factor: BACKOFF_FACTOR,
            max_delay: Duration::from_millis(MAX_DELAY_MS),
            jitter_fraction: JITTER_FRACTION,
        }
    }
}

/// An engine wrapper that adds retry with exponential backoff.
pub struct RetryEngine {
    inner: Arc<dyn Engine>,
    config: RetryConfig,
}

impl RetryEngine {
    pub fn new(inner: Arc<dyn Engine>) -> Self {
        Self {
            inner,
            config: RetryConfig::default(),
        }
    }

    pub fn with_config(inner: Arc<dyn Engine>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Delay for a given retry attempt (0-indexed).
    fn delay_for_attempt(&self, attempt: u32, rate_limit_delay: Option<Duration>) -> Duration {
        // If the server told us how long to wait, use that (plus a small buffer).
        if let Some(rl_delay) = rate_limit_delay {
            return rl_delay + Duration::from_millis(100);
        }

        let base_ms = self.config.initial_delay.as_millis() as f64
            * self.config.backoff_factor.powi(attempt as i32);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let jitter = deterministic_jitter(attempt, self.config.jitter_fraction);
        let final_ms = (capped_ms * jitter).max(100.0);

        Duration::from_millis(final_ms as u64)
    }
}

/// Determine if an error should be retried. Structured classification first,
/// then the message-token scan for quota failures the adapter couldn't tag.
fn should_retry(error: &CitemeterError) -> bool {
    if error.is_retriable() {
        return true;
    }
    match error {
        CitemeterError::Engine { message, .. } => {
            let lower = message.to_lowercase();
            TRANSIENT_TOKENS.iter().any(|t| lower.contains(t))
        }
        _ => false,
    }
}

/// Extract a rate-limit retry delay from the error, if the server gave one.
fn rate_limit_delay(error: &CitemeterError) -> Option<Duration> {
    match error {
        CitemeterError::RateLimited { retry_after_ms, .. } if *retry_after_ms > 0 => {
            Some(Duration::from_millis(*retry_after_ms))
        }
        _ => None,
    }
}

/// Deterministic jitter to keep retries reproducible in tests.
/// Returns a multiplier in [1 - fraction, 1 + fraction].
fn deterministic_jitter(attempt: u32, fraction: f64) -> f64 {
    let hash = (attempt.wrapping_mul(2654435761)) as f64 / u32::MAX as f64; // 0.0..1.0
    1.0 + fraction * (2.0 * hash - 1.0)
}

#[async_trait]
impl Engine for RetryEngine {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn run(&self, prompt: &str) -> Result<EngineResponse, CitemeterError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.inner.run(prompt).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !should_retry(&e) || attempt == self.config.max_retries {
                        return Err(e);
                    }

                    let rl_delay = rate_limit_delay(&e);
                    let delay = self.delay_for_attempt(attempt, rl_delay);

                    tracing::warn!(
                        engine = self.inner.name(),
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying after error: {}",
                        e
                    );

                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(CitemeterError::Engine {
            provider: self.inner.name().to_string(),
            message: "All retries exhausted".into(),
            retriable: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_should_retry_rate_limited() {
        let err = CitemeterError::RateLimited {
            provider: "google".into(),
            retry_after_ms: 5000,
        };
        assert!(should_retry(&err));
    }

    #[test]
    fn test_should_retry_retriable_engine_error() {
        let err = CitemeterError::Engine {
            provider: "google".into(),
            message: "HTTP 500".into(),
            retriable: true,
        };
        assert!(should_retry(&err));
    }

    #[test]
    fn test_should_retry_quota_message() {
        // Not flagged retriable, but the message marks it transient.
        let err = CitemeterError::Engine {
            provider: "google".into(),
            message: "HTTP 403: RESOURCE EXHAUSTED for quota metric".into(),
            retriable: false,
        };
        assert!(should_retry(&err));
    }

    #[test]
    fn test_should_not_retry_plain_bad_request() {
        let err = CitemeterError::Engine {
            provider: "openai".into(),
            message: "HTTP 400: invalid model".into(),
            retriable: false,
        };
        assert!(!should_retry(&err));
    }

    #[test]
    fn test_should_not_retry_capability() {
        let err = CitemeterError::Capability {
            provider: "openai".into(),
            message: "web_search quota tool not enabled".into(),
        };
        assert!(!should_retry(&err));
    }

    #[test]
    fn test_should_not_retry_config() {
        assert!(!should_retry(&CitemeterError::Config("bad engine".into())));
    }

    #[test]
    fn test_rate_limit_delay_extraction() {
        let err = CitemeterError::RateLimited {
            provider: "google".into(),
            retry_after_ms: 3000,
        };
        assert_eq!(rate_limit_delay(&err), Some(Duration::from_millis(3000)));
    }

    #[test]
    fn test_delay_for_attempt_exponential() {
        let engine = RetryEngine::new(Arc::new(FailingEngine::default()));
        let d0 = engine.delay_for_attempt(0, None);
        let d1 = engine.delay_for_attempt(1, None);
        let d2 = engine.delay_for_attempt(2, None);

        // d0 ≈ 2000ms, d1 ≈ 4000ms, d2 ≈ 8000ms, within jitter bounds
        assert!(d0.as_millis() >= 1500 && d0.as_millis() <= 2500);
        assert!(d1.as_millis() >= 3000 && d1.as_millis() <= 5000);
        assert!(d2.as_millis() >= 6000 && d2.as_millis() <= 10000);
    }

    #[test]
    fn test_delay_capped_at_max() {
        let engine = RetryEngine::new(Arc::new(FailingEngine::default()));
        let d = engine.delay_for_attempt(10, None);
        assert!(d.as_millis() <= 36_000); // max + jitter margin
    }

    #[test]
    fn test_delay_uses_rate_limit_hint() {
        let engine = RetryEngine::new(Arc::new(FailingEngine::default()));
        let d = engine.delay_for_attempt(0, Some(Duration::from_millis(10_000)));
        assert_eq!(d.as_millis(), 10_100);
    }

    #[test]
    fn test_deterministic_jitter_range() {
        for attempt in 0..20 {
            let j = deterministic_jitter(attempt, 0.2);
            assert!((0.8..=1.2).contains(&j), "jitter {j} out of range");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_retries_then_succeeds() {
        let inner = Arc::new(FailingEngine::failing_times(2));
        let engine = RetryEngine::new(inner.clone());
        let resp = engine.run("hello").await.unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exhausts_retries() {
        let inner = Arc::new(FailingEngine::failing_times(100));
        let engine = RetryEngine::new(inner.clone());
        let err = engine.run("hello").await.unwrap_err();
        assert!(err.is_retriable());
        // Initial attempt plus two retries: three calls total.
        assert_eq!(inner.calls(), 3);
        assert_eq!(inner.calls(), MAX_RETRIES + 1);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_fatal() {
        let inner = Arc::new(FailingEngine::fatal());
        let engine = RetryEngine::new(inner.clone());
        engine.run("hello").await.unwrap_err();
        assert_eq!(inner.calls(), 1);
    }

    // Engine that fails N times before succeeding.
    #[derive(Default)]
    struct FailingEngine {
        failures: u32,
        fatal: bool,
        calls: AtomicU32,
    }

    impl FailingEngine {
        fn failing_times(n: u32) -> Self {
            Self {
                failures: n,
                ..Default::default()
            }
        }

        fn fatal() -> Self {
            Self {
                failures: 100,
                fatal: true,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Engine for FailingEngine {
        fn name(&self) -> &str {
            "fake/flaky"
        }

        async fn run(&self, _prompt: &str) -> Result<EngineResponse, CitemeterError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fatal {
                return Err(CitemeterError::Engine {
                    provider: "fake".into(),
                    message: "HTTP 400: bad input".into(),
                    retriable: false,
                });
            }
            if call < self.failures {
                return Err(CitemeterError::Engine {
                    provider: "fake".into(),
                    message: "HTTP 500: flaky".into(),
                    retriable: true,
                });
            }
            Ok(EngineResponse {
                content: "ok".into(),
                cites: vec![],
                raw: serde_json::Value::Null,
            })
        }
    }
}
