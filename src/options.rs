use std::{fmt, sync::Arc, time::Duration};

use crate::{Result, SimplismartError};

/// Configures the HTTP transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
        }
    }
}

/// Which failures the retry loop is allowed to mask.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RetryOn {
    /// Every transport error and every non-success status is retried,
    /// regardless of status class.
    #[default]
    AnyFailure,
    /// Only timeouts, connection-level errors and 408/429/5xx gateway-style
    /// statuses are retried. Other failures are returned immediately.
    TransientOnly,
}

type BackoffFn = Arc<dyn Fn(usize) -> Duration + Send + Sync>;

/// Bounded retry configuration for [`crate::SimplismartClient::submit`].
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    backoff_fn: Option<BackoffFn>,
    retry_on: RetryOn,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field(
                "backoff_fn",
                &if self.backoff_fn.is_some() {
                    "<custom>"
                } else {
                    "<base_delay^attempt>"
                },
            )
            .field("retry_on", &self.retry_on)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_fn: None,
            retry_on: RetryOn::AnyFailure,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the default backoff function.
    ///
    /// `max_attempts` counts every transmission, the first one included,
    /// and must be at least 1.
    pub fn new(max_attempts: usize, base_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(SimplismartError::Config(
                "max_attempts must be at least 1".to_owned(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            ..Self::default()
        })
    }

    /// A policy that sends once and never sleeps.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Replaces the backoff function.
    ///
    /// The closure receives the 0-based index of the attempt that just
    /// failed and returns how long to wait before the next one.
    pub fn with_backoff<F>(mut self, backoff_fn: F) -> Self
    where
        F: Fn(usize) -> Duration + Send + Sync + 'static,
    {
        self.backoff_fn = Some(Arc::new(backoff_fn));
        self
    }

    pub fn with_retry_on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub fn retry_on(&self) -> RetryOn {
        self.retry_on
    }

    /// Delay to wait after attempt `attempt` fails.
    ///
    /// Default: `base_delay` (in seconds) raised to the power `attempt`, so
    /// attempt 0 always waits one second and a base of 2s yields 1s, 2s, 4s.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        match &self.backoff_fn {
            Some(backoff_fn) => backoff_fn(attempt),
            None => default_backoff(self.base_delay, attempt),
        }
    }
}

fn default_backoff(base_delay: Duration, attempt: usize) -> Duration {
    let exp = attempt.min(i32::MAX as usize) as i32;
    let secs = base_delay.as_secs_f64().powi(exp);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
