//! Polling with exponential backoff and cancellation support.
//!
//! Some deletes are accepted asynchronously: the API returns before the
//! resource is gone. The backend polls until it is, so the parent deletion
//! that follows does not race it.

use agentcore_sweep_common::AwsError;
use backon::{BackoffBuilder, ExponentialBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Configuration for resource waiting with exponential backoff.
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Initial delay between checks
    pub initial_delay: Duration,
    /// Maximum delay between checks (cap for exponential growth)
    pub max_delay: Duration,
    /// Maximum total time to wait before timeout
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(20),
        }
    }
}

/// How a successful wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The condition held
    Ready,
    /// The token fired before the condition held
    Cancelled,
}

/// Poll `check` until it returns `Ok(true)`.
///
/// Uses `backon::ExponentialBuilder` for delay calculation and `tokio::select!`
/// for cancellation support. A check error ends the wait immediately; running
/// out of time yields [`AwsError::Timeout`].
///
/// # Example
/// ```ignore
/// wait_for_resource(
///     WaitConfig::default(),
///     Some(&cancel_token),
///     || async { Ok(target_is_gone().await) },
///     "gateway target gw-1:t-1",
/// ).await?;
/// ```
pub async fn wait_for_resource<F, Fut>(
    config: WaitConfig,
    cancel: Option<&CancellationToken>,
    check: F,
    resource_name: &str,
) -> Result<WaitOutcome, AwsError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<bool, AwsError>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let mut delays = ExponentialBuilder::default()
        .with_min_delay(config.initial_delay)
        .with_max_delay(config.max_delay)
        .with_factor(2.0)
        .build();

    loop {
        attempts += 1;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(resource = %resource_name, attempts, "Wait cancelled");
            return Ok(WaitOutcome::Cancelled);
        }

        if start.elapsed() >= config.timeout {
            return Err(AwsError::Timeout(format!(
                "{} still present after {:?} ({} checks)",
                resource_name, config.timeout, attempts
            )));
        }

        match check().await {
            Ok(true) => {
                debug!(resource = %resource_name, attempts, "Condition met");
                return Ok(WaitOutcome::Ready);
            }
            Ok(false) => {
                let delay = delays.next().unwrap_or(config.max_delay);
                debug!(
                    resource = %resource_name,
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Condition not met, polling again"
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = async {
                        match cancel {
                            Some(token) => token.cancelled().await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {
                        debug!(resource = %resource_name, attempts, "Wait cancelled");
                        return Ok(WaitOutcome::Cancelled);
                    }
                }
            }
            Err(e) => {
                warn!(resource = %resource_name, error = %e, "Check failed");
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_a_few_checks() {
        let checks = Arc::new(AtomicU32::new(0));
        let counter = checks.clone();
        let outcome = wait_for_resource(
            WaitConfig::default(),
            None,
            move || {
                let counter = counter.clone();
                async move { Ok::<_, AwsError>(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
            },
            "target",
        )
        .await
        .unwrap();
        assert_eq!(outcome, WaitOutcome::Ready);
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let config = WaitConfig {
            timeout: Duration::from_secs(3),
            ..Default::default()
        };
        let err = wait_for_resource(config, None, || async { Ok::<_, AwsError>(false) }, "domain")
            .await
            .unwrap_err();
        assert!(matches!(err, AwsError::Timeout(_)));
        assert!(err.to_string().contains("domain still present"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_waiting() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            trigger.cancel();
        });
        let outcome = wait_for_resource(
            WaitConfig::default(),
            Some(&token),
            || async { Ok::<_, AwsError>(false) },
            "target",
        )
        .await
        .unwrap();
        assert_eq!(outcome, WaitOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_check_error_is_returned() {
        let err = wait_for_resource(
            WaitConfig::default(),
            None,
            || async { Err::<bool, _>(AwsError::AccessDenied("no describe".into())) },
            "pool",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AwsError::AccessDenied(_)));
    }
}
