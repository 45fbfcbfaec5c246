//! Retry policy for publish attempts

use std::future::Future;
use std::time::Duration;

use crate::constants::RETRY_BACKOFF_SECS;

/// Attempt budget plus the delay to wait before each attempt.
/// `backoff[i]` is slept before attempt `i + 1`; missing entries reuse the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_backoff_secs(&RETRY_BACKOFF_SECS)
    }
}

/// Result of running an operation under a policy
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// One attempt per listed delay
    pub fn from_backoff_secs(secs: &[u64]) -> Self {
        Self {
            max_attempts: secs.len().max(1) as u32,
            backoff: secs.iter().copied().map(Duration::from_secs).collect(),
        }
    }

    /// Delay to wait before the given 1-based attempt
    pub fn delay_before(&self, attempt: u32) -> Duration {
        let idx = attempt.saturating_sub(1) as usize;
        self.backoff
            .get(idx)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or_default()
    }

    /// Run `op` until it succeeds or the budget is spent.
    /// `on_failure` sees each failed attempt number and its error.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        mut on_failure: impl FnMut(u32, &E),
    ) -> RetryOutcome<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match op(attempt).await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    on_failure(attempt, &e);
                    if attempt >= max_attempts {
                        return RetryOutcome {
                            result: Err(e),
                            attempts: attempt,
                        };
                    }
                }
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_three_attempts_with_growing_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(10));
        assert_eq!(policy.delay_before(3), Duration::from_secs(30));
        assert_eq!(policy.delay_before(4), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let policy = RetryPolicy::default();
        let mut failures = Vec::new();

        let outcome = policy
            .run(
                |attempt| async move {
                    if attempt < 2 { Err("boom") } else { Ok(attempt) }
                },
                |attempt, _| failures.push(attempt),
            )
            .await;

        assert_eq!(outcome.result, Ok(2));
        assert_eq!(outcome.attempts, 2);
        assert_eq!(failures, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_returns_last_error() {
        let policy = RetryPolicy::from_backoff_secs(&[0, 1]);
        let start = tokio::time::Instant::now();

        let outcome: RetryOutcome<(), String> = policy
            .run(|attempt| async move { Err(format!("fail {attempt}")) }, |_, _| {})
            .await;

        assert_eq!(outcome.result, Err("fail 2".to_string()));
        assert_eq!(outcome.attempts, 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_secs(2));
    }
}
