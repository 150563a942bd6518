//! Retry logic with exponential backoff for upstream requests.
//!
//! A failed request is classified into a [`FailureType`]; the
//! [`RetryPolicy`] then decides whether another attempt is made and how long
//! to wait first.
//!
//! # Example
//!
//! ```
//! use scholar_core::ScholarError;
//! use scholar_core::upstream::{RetryDecision, RetryPolicy, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = ScholarError::UpstreamRateLimited { url: "https://api.test".into() };
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(attempt, 2);
//!         assert_eq!(delay.as_millis(), 1000);
//!     }
//!     RetryDecision::DoNotRetry { .. } => unreachable!(),
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, instrument};

use super::Notifier;
use crate::error::ScholarError;

/// Default attempt ceiling, initial request included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Cap on a single backoff delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(16);

/// Delay doubles each attempt.
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Advisory shown each time the provider rate-limits a request.
pub const RATE_LIMIT_NOTICE: &str = "Rate limit exceeded. Trying again.";

/// Advisory shown when the provider has no record of the paper.
pub const NOT_FOUND_NOTICE: &str = "The paper cannot be found. Stop trying.";

/// Classification of upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Might succeed on a later attempt (5xx, transport errors, other 4xx).
    Transient,
    /// Will not succeed (404, local errors).
    Permanent,
    /// HTTP 429; retried with backoff and a user advisory.
    RateLimited,
}

/// Decision on whether to retry a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, first retry is 2).
        attempt: u32,
    },
    /// Give up.
    DoNotRetry {
        /// Human-readable reason.
        reason: String,
    },
}

/// Exponential backoff configuration.
///
/// Defaults: 5 attempts, 1 s base delay doubling per attempt, 16 s cap and no
/// jitter, giving waits of 1 s, 2 s, 4 s and 8 s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f32,
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with custom settings (`max_attempts` is clamped to at least 1).
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            max_jitter: Duration::ZERO,
        }
    }

    /// Default policy with a different attempt ceiling (clamped to at least 1).
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Replaces the delay before the first retry.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Adds up to `max_jitter` of random delay to every backoff.
    #[must_use]
    pub fn with_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after `attempt` (1-indexed) failed with `failure_type`.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// `min(base_delay * multiplier^(attempt - 1), max_delay) + jitter`
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let exponent = f64::from(attempt.saturating_sub(1));
        let delay_ms = base_ms * f64::from(self.backoff_multiplier).powf(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms as u64) + self.calculate_jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=self.max_jitter.as_millis() as u64))
    }
}

/// Classifies an error for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | `UpstreamNotFound` (404) | Permanent |
/// | `UpstreamRateLimited` (429) | RateLimited |
/// | `UpstreamError` (other status, transport) | Transient |
/// | anything else | Permanent |
#[must_use]
pub fn classify_error(error: &ScholarError) -> FailureType {
    match error {
        ScholarError::UpstreamRateLimited { .. } => FailureType::RateLimited,
        ScholarError::UpstreamError { .. } => FailureType::Transient,
        _ => FailureType::Permanent,
    }
}

/// Maps an HTTP status to the error it represents; `None` for 2xx.
#[must_use]
pub fn error_for_status(url: &str, status: u16) -> Option<ScholarError> {
    match status {
        200..=299 => None,
        404 => Some(ScholarError::UpstreamNotFound {
            url: url.to_string(),
        }),
        429 => Some(ScholarError::UpstreamRateLimited {
            url: url.to_string(),
        }),
        other => Some(ScholarError::upstream_status(url, other)),
    }
}

/// Runs `operation` until it succeeds or `policy` gives up.
///
/// The closure receives the 1-indexed attempt number. Rate-limit and
/// not-found failures are reported to `notifier` as they happen.
///
/// # Errors
///
/// Returns the error of the last attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    notifier: &dyn Notifier,
    mut operation: F,
) -> Result<T, ScholarError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ScholarError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let failure_type = classify_error(&error);
        match &error {
            ScholarError::UpstreamRateLimited { .. } => notifier.notify(RATE_LIMIT_NOTICE),
            ScholarError::UpstreamNotFound { .. } => notifier.notify(NOT_FOUND_NOTICE),
            _ => {}
        }

        match policy.should_retry(failure_type, attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                info!(
                    attempt = next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "retrying upstream request"
                );
                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(attempt, reason = %reason, "giving up on upstream request");
                return Err(error);
            }
        }
    }
}
