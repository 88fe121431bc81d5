//! Bounded retry around a caller-supplied unit of work

use crate::executor::HttpClient;
use peerfetch_core::config::consts;
use peerfetch_core::{FetchError, FetchSettings, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// How many times to run a unit of work and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: consts::retry::DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(consts::retry::DEFAULT_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A fixed delay between attempts; no backoff, no jitter
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self::new(settings.retry.max_attempts, settings.retry.delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn run<T, F>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<T>,
    {
        if self.max_attempts == 0 {
            return Err(FetchError::InvalidArgument(
                "retry count must be at least 1".to_string(),
            ));
        }

        let mut number = 1;
        loop {
            match attempt(number) {
                Ok(value) => {
                    if number > 1 {
                        debug!(attempt = number, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if number < self.max_attempts => {
                    warn!(
                        attempt = number,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "attempt failed, retrying in {:?}",
                        self.delay
                    );
                    thread::sleep(self.delay);
                    number += 1;
                }
                Err(e) => {
                    warn!(
                        attempt = number,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "attempt failed, giving up"
                    );
                    return Err(e);
                }
            }
        }
    }
}

impl HttpClient {
    /// Runs `work` against this client until it succeeds or attempts run out
    ///
    /// The same client (and its pooled connections) is handed to every
    /// attempt. There is no sleep after the final attempt. The error of the
    /// last attempt is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` without calling `work` if the policy allows
    /// zero attempts.
    pub fn execute_with_retry<T, F>(&mut self, policy: &RetryPolicy, mut work: F) -> Result<T>
    where
        F: FnMut(&mut HttpClient) -> Result<T>,
    {
        policy.run(|_| work(self))
    }
}

/// Runs `work` with a freshly created client, retrying per `policy`
pub fn execute_with_retry<T, F>(policy: &RetryPolicy, work: F) -> Result<T>
where
    F: FnMut(&mut HttpClient) -> Result<T>,
{
    HttpClient::new().execute_with_retry(policy, work)
}
