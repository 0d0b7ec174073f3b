//! Bounded retries for delete calls
//!
//! Only transient failures (throttling, timeouts, transport and service
//! faults) are retried. Every attempt is bounded by the per-call timeout, and
//! a stopped run makes no further attempts.

use agentcore_sweep_common::defaults::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_INITIAL_DELAY,
    DEFAULT_RETRY_MAX_DELAY,
};
use agentcore_sweep_common::{AwsError, ResourceBackend, ResourceRef};
use backon::{ExponentialBuilder, Retryable};
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Retry and timeout policy for one resource's delete
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Bound on a single delete call
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
            max_delay: DEFAULT_RETRY_MAX_DELAY,
            call_timeout: Duration::from_secs(DEFAULT_CALL_TIMEOUT_SECS),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(retries)
    }
}

/// Delete `resource`, retrying transient failures.
///
/// Once `stop` fires no further attempt is made: a pending backoff ends early
/// and the previous failure is returned. A call already in flight is left to
/// finish so its result is known.
///
/// Returns the final result together with the number of calls issued.
pub async fn delete_with_retry<B: ResourceBackend>(
    backend: &B,
    resource: &ResourceRef,
    policy: &RetryPolicy,
    stop: &CancellationToken,
) -> (Result<(), AwsError>, u32) {
    let counter = AtomicU32::new(0);
    let attempts = &counter;
    let previous = Mutex::new(None::<AwsError>);
    let last_error = &previous;
    let call_timeout = policy.call_timeout;

    let result = (move || async move {
        if stop.is_cancelled() {
            if let Some(err) = last_error.lock().ok().and_then(|mut slot| slot.take()) {
                return Err(err);
            }
        }

        attempts.fetch_add(1, Ordering::Relaxed);
        let result = match tokio::time::timeout(call_timeout, backend.delete(resource)).await {
            Ok(result) => result,
            Err(_) => Err(AwsError::Timeout(format!(
                "delete of {} did not finish within {:?}",
                resource.key(),
                call_timeout
            ))),
        };
        if let (Err(err), Ok(mut slot)) = (&result, last_error.lock()) {
            *slot = Some(err.clone());
        }
        result
    })
    .retry(policy.backoff())
    .sleep(interruptible_sleep(stop.clone()))
    .when(|err: &AwsError| err.is_transient() && !stop.is_cancelled())
    .notify(|err: &AwsError, delay: Duration| {
        warn!(
            kind = %resource.kind,
            id = %resource.id,
            error = %err,
            delay_ms = delay.as_millis(),
            "Transient delete failure, retrying"
        );
    })
    .await;

    (result, counter.load(Ordering::Relaxed))
}

/// Backoff sleeper that wakes early when `stop` fires
fn interruptible_sleep(
    stop: CancellationToken,
) -> impl Fn(Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> + 'static {
    move |delay| {
        let stop = stop.clone();
        Box::pin(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.cancelled() => {}
            }
        })
    }
}
