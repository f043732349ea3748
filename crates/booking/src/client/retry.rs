//! Bounded retry with a configured backoff list.

use std::future::Future;
use std::time::Duration;

use super::ClientError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_MS: [u64; 3] = [200, 500, 1000];

/// Retry envelope for remote inventory calls.
///
/// Attempt `k` (1-indexed) that fails with a retryable error is followed by a
/// sleep of `backoff[min(k - 1, len - 1)]`. No sleep follows the final
/// attempt. An empty backoff list retries immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: default_backoff(),
        }
    }
}

fn default_backoff() -> Vec<Duration> {
    DEFAULT_BACKOFF_MS
        .iter()
        .copied()
        .map(Duration::from_millis)
        .collect()
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Single attempt, no backoff.
    pub fn no_retry() -> Self {
        Self::new(1, Vec::new())
    }

    /// Parses a comma-separated list of milliseconds.
    ///
    /// Blank entries are skipped; any unparsable entry (or blank input)
    /// yields the default `200,500,1000`.
    pub fn parse_backoff(csv: &str) -> Vec<Duration> {
        if csv.trim().is_empty() {
            return default_backoff();
        }
        csv.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<u64>().map(Duration::from_millis))
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_else(|_| default_backoff())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &[Duration] {
        &self.backoff
    }

    /// Sleep that follows failed attempt `attempt` (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let Some(last) = self.backoff.len().checked_sub(1) else {
            return Duration::ZERO;
        };
        let idx = (attempt.saturating_sub(1) as usize).min(last);
        self.backoff[idx]
    }

    /// Runs `call` until it succeeds, fails with a non-retryable error, or
    /// attempts run out.
    ///
    /// Exhaustion is reported as [`ClientError::Unavailable`] carrying the
    /// operation name and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ClientError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match call(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "inventory call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::debug!(operation, attempt, error = %err, "inventory call failed, not retrying");
                    return Err(err);
                }
                Err(err) => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(operation, attempt, error = %err, "inventory call attempts exhausted");
                        metrics::counter!("inventory_client_exhausted_total", "operation" => operation)
                            .increment(1);
                        return Err(ClientError::Unavailable {
                            operation,
                            attempts: attempt,
                        });
                    }
                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "inventory call failed, retrying"
                    );
                    metrics::counter!("inventory_client_retries_total", "operation" => operation)
                        .increment(1);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
