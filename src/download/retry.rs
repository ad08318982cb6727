//! Retry budget and backoff for download attempts.
//!
//! A failed attempt's [`FailureCause`] is first sorted into a [`FailureType`].
//! Remote trouble (network, timeout, any HTTP status, an empty body) is
//! [`FailureType::Transient`]; anything that another request cannot fix is
//! [`FailureType::Permanent`]. The [`RetryPolicy`] then answers with a
//! [`RetryDecision`].
//!
//! ```
//! use std::time::Duration;
//!
//! use paper_downloader_core::download::{
//!     FailureCause, RetryDecision, RetryPolicy, classify_failure,
//! };
//!
//! let policy = RetryPolicy::with_max_retries(2).without_jitter();
//! let kind = classify_failure(&FailureCause::Timeout);
//!
//! assert_eq!(
//!     policy.should_retry(kind, 1),
//!     RetryDecision::Retry { delay: Duration::from_secs(1), attempt: 2 }
//! );
//! assert!(matches!(policy.should_retry(kind, 3), RetryDecision::DoNotRetry { .. }));
//! ```

use std::time::{Duration, SystemTime};

use rand::Rng;
use tracing::{debug, instrument, warn};

use super::FailureCause;

/// Retries after the first attempt unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

const FIRST_BACKOFF: Duration = Duration::from_secs(1);
const BACKOFF_CEILING: Duration = Duration::from_secs(32);
const BACKOFF_FACTOR: f32 = 2.0;
const JITTER_CEILING: Duration = Duration::from_millis(500);

/// Longest server-requested delay honoured.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60 * 60);

/// Whether another attempt could change the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Worth another attempt.
    Transient,
    /// Final.
    Permanent,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then run attempt number `attempt`.
    Retry {
        /// Backoff before the next attempt.
        delay: Duration,
        /// The next attempt's number (the first retry is attempt 2).
        attempt: u32,
    },
    /// Give up.
    DoNotRetry {
        /// Why, for logs.
        reason: String,
    },
}

/// Retry budget plus exponential backoff.
///
/// The delay before attempt `n + 1` is
/// `min(first * factor^(n - 1), ceiling)` plus up to `jitter` of random
/// spread. The defaults (1 s doubling up to 32 s, 500 ms jitter) are used
/// by [`RetryPolicy::with_max_retries`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    first: Duration,
    ceiling: Duration,
    factor: f32,
    jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::with_max_retries(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// A policy with explicit backoff settings and the default jitter.
    #[must_use]
    pub fn new(max_retries: u32, first: Duration, ceiling: Duration, factor: f32) -> Self {
        Self {
            max_retries,
            first,
            ceiling,
            factor,
            jitter: JITTER_CEILING,
        }
    }

    /// Default backoff with a custom retry budget.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self::new(max_retries, FIRST_BACKOFF, BACKOFF_CEILING, BACKOFF_FACTOR)
    }

    /// Retries back to back, with no backoff and no jitter.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO, Duration::ZERO, 1.0).without_jitter()
    }

    /// Makes delays deterministic.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Retries after the first attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts a task may make.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decides what follows failed attempt number `attempt` (1-indexed).
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts()))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "failure is not retryable".to_string(),
            };
        }
        if attempt >= self.max_attempts() {
            return RetryDecision::DoNotRetry {
                reason: format!("all {} attempts used", self.max_attempts()),
            };
        }

        let delay = self.backoff(attempt) + self.spread();
        debug!(attempt, delay_ms = delay.as_millis(), "scheduling retry");
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let steps = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scale = f64::from(self.factor).powi(steps);
        Duration::try_from_secs_f64(self.first.as_secs_f64() * scale)
            .map_or(self.ceiling, |delay| delay.min(self.ceiling))
    }

    fn spread(&self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        let upper = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::thread_rng().gen_range(0..=upper))
    }
}

/// Sorts a failure cause for [`RetryPolicy::should_retry`].
///
/// Every HTTP status is transient, including 403 and 404. A landing page
/// without a PDF link, an invalid URL or a local write error is permanent.
#[must_use]
pub fn classify_failure(cause: &FailureCause) -> FailureType {
    match cause {
        FailureCause::Network { .. }
        | FailureCause::Timeout
        | FailureCause::Http { .. }
        | FailureCause::EmptyBody => FailureType::Transient,
        FailureCause::InvalidUrl { .. }
        | FailureCause::MissingPdfLink { .. }
        | FailureCause::Io { .. }
        | FailureCause::Internal { .. } => FailureType::Permanent,
    }
}

/// Reads a `Retry-After` value: either delay-seconds or an HTTP-date.
///
/// Negative numbers, dates in the past and garbage yield `None`. Anything
/// longer than an hour is clamped to an hour.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    let delay = match value.parse::<i64>() {
        Ok(seconds) => Duration::from_secs(u64::try_from(seconds).ok()?),
        Err(_) => httpdate::parse_http_date(value)
            .ok()?
            .duration_since(SystemTime::now())
            .ok()?,
    };
    if delay > MAX_RETRY_AFTER {
        warn!(requested_secs = delay.as_secs(), "Retry-After clamped to one hour");
        return Some(MAX_RETRY_AFTER);
    }
    Some(delay)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn delay_of(decision: RetryDecision) -> Duration {
        match decision {
            RetryDecision::Retry { delay, .. } => delay,
            RetryDecision::DoNotRetry { reason } => panic!("expected a retry, got: {reason}"),
        }
    }

    #[test]
    fn test_default_budget_is_three_attempts() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), DEFAULT_MAX_RETRIES);
        assert_eq!(policy.max_attempts(), 3);
    }

    #[test]
    fn test_budget_of_r_allows_r_plus_one_attempts() {
        for retries in 0..=4 {
            let policy = RetryPolicy::immediate(retries);
            let mut attempt = 1;
            while let RetryDecision::Retry { attempt: next, .. } =
                policy.should_retry(FailureType::Transient, attempt)
            {
                attempt = next;
            }
            assert_eq!(attempt, retries + 1, "retries = {retries}");
        }
    }

    #[test]
    fn test_permanent_failures_stop_immediately() {
        let decision = RetryPolicy::with_max_retries(10).should_retry(FailureType::Permanent, 1);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_backoff_doubles_up_to_ceiling() {
        let policy = RetryPolicy::with_max_retries(10).without_jitter();
        let secs: Vec<u64> = (1..=7)
            .map(|attempt| delay_of(policy.should_retry(FailureType::Transient, attempt)).as_secs())
            .collect();
        assert_eq!(secs, [1, 2, 4, 8, 16, 32, 32]);
    }

    #[test]
    fn test_huge_attempt_numbers_stay_at_ceiling() {
        let policy = RetryPolicy::new(u32::MAX, FIRST_BACKOFF, BACKOFF_CEILING, 2.0).without_jitter();
        let delay = delay_of(policy.should_retry(FailureType::Transient, 5000));
        assert_eq!(delay, BACKOFF_CEILING);
    }

    #[test]
    fn test_jitter_stays_within_half_a_second() {
        let policy = RetryPolicy::default();
        for _ in 0..50 {
            let delay = delay_of(policy.should_retry(FailureType::Transient, 1));
            assert!((FIRST_BACKOFF..=FIRST_BACKOFF + JITTER_CEILING).contains(&delay));
        }
    }

    #[test]
    fn test_classification() {
        let transient = [
            FailureCause::Http { status: 404 },
            FailureCause::Http { status: 503 },
            FailureCause::Timeout,
            FailureCause::Network {
                message: "connection reset".to_string(),
            },
            FailureCause::EmptyBody,
        ];
        for cause in &transient {
            assert_eq!(classify_failure(cause), FailureType::Transient, "{cause}");
        }

        let permanent = [
            FailureCause::Io {
                message: "no space left on device".to_string(),
            },
            FailureCause::InvalidUrl {
                url: "mailto:x".to_string(),
            },
            FailureCause::MissingPdfLink {
                landing_url: "https://ojs.aaai.org/x".to_string(),
            },
        ];
        for cause in &permanent {
            assert_eq!(classify_failure(cause), FailureType::Permanent, "{cause}");
        }
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 0 "), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("-5"), None);
        assert_eq!(parse_retry_after("later"), None);
        assert_eq!(parse_retry_after("86400"), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn test_retry_after_http_date() {
        let soon = httpdate::fmt_http_date(SystemTime::now() + Duration::from_secs(90));
        let delay = parse_retry_after(&soon).unwrap();
        assert!((Duration::from_secs(80)..=Duration::from_secs(90)).contains(&delay));

        let past = httpdate::fmt_http_date(SystemTime::now() - Duration::from_secs(60));
        assert_eq!(parse_retry_after(&past), None);
    }
}
