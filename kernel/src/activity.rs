//! Activity execution: the sole permitted source of non-determinism (§4.1).
//!
//! Workflow code never calls the outside world directly; it calls
//! [`execute_activity`], which applies a `start_to_close_timeout` and the given
//! [`RetryPolicy`] around an arbitrary async closure. Generalizes the teacher's
//! node-retry loop (`graph/retry.rs`'s `RetryPolicy`, driving a per-node retry loop
//! in the graph executor) to a standalone helper usable outside the graph engine.

use std::future::Future;
use std::time::Duration;

use crate::error::ActivityError;
use crate::retry::RetryPolicy;

/// `start_to_close_timeout` + `retry_policy`, per §4.1.
#[derive(Debug, Clone)]
pub struct ActivityOptions {
    pub start_to_close_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl ActivityOptions {
    pub fn new(start_to_close_timeout: Duration, retry_policy: RetryPolicy) -> Self {
        Self {
            start_to_close_timeout,
            retry_policy,
        }
    }

    /// Default for agent-side activities: 30s timeout, no retry (§5).
    pub fn agent_default() -> Self {
        Self::new(Duration::from_secs(30), RetryPolicy::None)
    }

    /// Default for I/O activities: 60s timeout, exponential retry (§5).
    pub fn io_default() -> Self {
        Self::new(Duration::from_secs(60), RetryPolicy::default_io())
    }
}

/// Runs `f` under `opts`: applies the timeout per attempt, retries transient
/// failures per the policy, surfaces the last error once attempts are exhausted or
/// the failure is non-transient.
pub async fn execute_activity<F, Fut, T>(
    name: &str,
    opts: &ActivityOptions,
    mut f: F,
) -> Result<T, ActivityError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ActivityError>>,
{
    let mut attempt = 0usize;
    loop {
        let outcome = tokio::time::timeout(opts.start_to_close_timeout, f()).await;
        let result = match outcome {
            Ok(inner) => inner,
            Err(_) => Err(ActivityError::timeout(format!(
                "activity '{name}' exceeded {:?}",
                opts.start_to_close_timeout
            ))),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && opts.retry_policy.should_retry(attempt) => {
                tracing::warn!(activity = name, attempt, error = %err, "retrying activity");
                tokio::time::sleep(opts.retry_policy.delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// **Scenario**: a transient failure that eventually succeeds retries and returns Ok.
    #[tokio::test]
    async fn transient_failure_retries_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = ActivityOptions::new(
            Duration::from_secs(1),
            RetryPolicy::fixed(3, Duration::from_millis(1)),
        );
        let calls2 = calls.clone();
        let result: Result<&str, ActivityError> =
            execute_activity("flaky", &opts, move || {
                let calls = calls2.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(ActivityError::transient("not yet"))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    /// **Scenario**: a permanent failure is surfaced immediately, no retry.
    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let opts = ActivityOptions::new(
            Duration::from_secs(1),
            RetryPolicy::fixed(5, Duration::from_millis(1)),
        );
        let calls2 = calls.clone();
        let result: Result<(), ActivityError> = execute_activity("bad-input", &opts, move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ActivityError::permanent("bad input"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// **Scenario**: exceeding start_to_close_timeout surfaces a Timeout error.
    #[tokio::test]
    async fn timeout_is_surfaced_as_timeout_error() {
        let opts = ActivityOptions::new(Duration::from_millis(5), RetryPolicy::None);
        let result: Result<(), ActivityError> = execute_activity("slow", &opts, || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Timeout);
    }
}
