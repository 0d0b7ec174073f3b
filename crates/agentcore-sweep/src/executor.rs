//! Plan executor
//!
//! Walks a [`DeletionPlan`] and records exactly one [`Outcome`] per step.
//!
//! ## Scheduling
//!
//! A step becomes ready once every graph predecessor has a terminal outcome,
//! whatever that outcome is: a failed target does not stop its gateway from
//! being attempted. Ready steps are dispatched lowest plan position first to
//! a [`JoinSet`] holding at most `concurrency` deletes. With a concurrency
//! of one, dispatch order is exactly plan order.
//!
//! Cancellation and the run deadline stop new dispatches and end the retries
//! of deletes in flight. A call already issued finishes and is recorded;
//! steps never dispatched are reported as failed with a `not attempted`
//! detail. A worker that panics is recorded as failed and still unblocks the
//! steps waiting on it.

use crate::graph::DependencyGraph;
use crate::planner::DeletionPlan;
use crate::retry::{RetryPolicy, delete_with_retry};
use agentcore_sweep_common::defaults::{DEFAULT_CONCURRENCY, DEFAULT_RUN_TIMEOUT_SECS};
use agentcore_sweep_common::{Outcome, ResourceBackend, ResourceRef};
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Detail reason for steps skipped after cancellation
pub const REASON_CANCELLED: &str = "run cancelled";

/// Detail reason for steps skipped after the run deadline
pub const REASON_TIMED_OUT: &str = "run timed out";

/// Executor tuning
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Deletes in flight at once (values below one are treated as one)
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Bound on the whole deletion phase
    pub run_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
        }
    }
}

/// Executes deletion plans against a backend
pub struct Executor<B> {
    backend: Arc<B>,
    config: ExecutorConfig,
}

impl<B: ResourceBackend + 'static> Executor<B> {
    pub fn new(backend: Arc<B>, config: ExecutorConfig) -> Self {
        Self { backend, config }
    }

    /// Run `plan` to completion or until stopped.
    ///
    /// Returns one outcome per plan step, in plan order.
    #[instrument(skip_all, fields(scope = %plan.scope(), steps = plan.len()))]
    pub async fn execute(
        &self,
        plan: &DeletionPlan,
        graph: &DependencyGraph,
        cancel: &CancellationToken,
    ) -> Vec<Outcome> {
        let steps = plan.steps();
        let concurrency = self.config.concurrency.max(1);
        // Fires on cancellation or at the run deadline; workers stop retrying
        let stop = cancel.child_token();

        let mut outcomes: Vec<Option<Outcome>> = vec![None; steps.len()];
        let mut blockers: Vec<usize> = steps
            .iter()
            .map(|step| graph.predecessors(&step.key()).count())
            .collect();
        let mut ready: BTreeSet<usize> = (0..steps.len()).filter(|&i| blockers[i] == 0).collect();
        let mut running: HashMap<Id, usize> = HashMap::new();
        let mut tasks: JoinSet<Outcome> = JoinSet::new();
        let mut halted: Option<&'static str> = None;

        let deadline = tokio::time::sleep(self.config.run_timeout);
        tokio::pin!(deadline);

        loop {
            if halted.is_none() {
                if cancel.is_cancelled() {
                    halted = Some(REASON_CANCELLED);
                } else if deadline.is_elapsed() {
                    halted = Some(REASON_TIMED_OUT);
                    stop.cancel();
                }
            }

            while halted.is_none() && tasks.len() < concurrency {
                let Some(idx) = ready.pop_first() else { break };
                let id = self.dispatch(&mut tasks, steps[idx].clone(), &stop);
                running.insert(id, idx);
            }

            if tasks.is_empty() {
                break;
            }

            let (idx, outcome) = tokio::select! {
                biased;

                _ = cancel.cancelled(), if halted.is_none() => {
                    warn!(in_flight = tasks.len(), "Run cancelled, waiting for in-flight deletes");
                    halted = Some(REASON_CANCELLED);
                    continue;
                }
                _ = &mut deadline, if halted.is_none() => {
                    warn!(in_flight = tasks.len(), "Run timed out, waiting for in-flight deletes");
                    halted = Some(REASON_TIMED_OUT);
                    stop.cancel();
                    continue;
                }
                joined = tasks.join_next_with_id() => match joined {
                    Some(Ok((id, outcome))) => match running.remove(&id) {
                        Some(idx) => (idx, outcome),
                        None => continue,
                    },
                    Some(Err(e)) => {
                        let Some(idx) = running.remove(&e.id()) else { continue };
                        let resource = steps[idx].clone();
                        let detail = if e.is_panic() {
                            let message = panic_message(e.into_panic().as_ref());
                            error!(
                                kind = %resource.kind,
                                id = %resource.id,
                                panic = %message,
                                "Delete worker panicked"
                            );
                            format!("worker panicked: {message}")
                        } else {
                            error!(
                                kind = %resource.kind,
                                id = %resource.id,
                                error = %e,
                                "Delete worker ended abnormally"
                            );
                            format!("delete worker ended abnormally: {e}")
                        };
                        (idx, Outcome::failed(resource, detail, 1))
                    }
                    None => continue,
                },
            };

            for next in graph.successors(&steps[idx].key()) {
                let Some(pos) = plan.position(next) else { continue };
                blockers[pos] = blockers[pos].saturating_sub(1);
                if blockers[pos] == 0 && outcomes[pos].is_none() {
                    ready.insert(pos);
                }
            }
            outcomes[idx] = Some(outcome);
        }

        let reason = halted.unwrap_or("a dependency never reported an outcome");
        steps
            .iter()
            .zip(outcomes)
            .map(|(step, outcome)| {
                outcome.unwrap_or_else(|| Outcome::not_attempted(step.clone(), reason))
            })
            .collect()
    }

    /// Spawn one delete; a panic surfaces as a failed join
    fn dispatch(
        &self,
        tasks: &mut JoinSet<Outcome>,
        resource: ResourceRef,
        stop: &CancellationToken,
    ) -> Id {
        let backend = Arc::clone(&self.backend);
        let policy = self.config.retry.clone();
        let stop = stop.clone();
        info!(kind = %resource.kind, id = %resource.id, "Deleting");

        tasks
            .spawn(async move { delete_resource(&*backend, &resource, &policy, &stop).await })
            .id()
    }
}

/// Delete one resource and classify the result
async fn delete_resource<B: ResourceBackend>(
    backend: &B,
    resource: &ResourceRef,
    policy: &RetryPolicy,
    stop: &CancellationToken,
) -> Outcome {
    let (result, attempts) = delete_with_retry(backend, resource, policy, stop).await;
    match result {
        Ok(()) => Outcome::deleted(resource.clone(), attempts),
        Err(e) if e.is_not_found() => {
            info!(kind = %resource.kind, id = %resource.id, "Already absent");
            Outcome::already_absent(resource.clone(), attempts)
        }
        Err(e) => {
            warn!(kind = %resource.kind, id = %resource.id, attempts, error = %e, "Delete failed");
            let detail = match e.suggestion() {
                Some(hint) => format!("{e} ({hint})"),
                None => e.to_string(),
            };
            Outcome::failed(resource.clone(), detail, attempts)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::planner::plan;
    use agentcore_sweep_common::{
        AwsError, DEPENDENCY_RULES, Inventory, OutcomeStatus, ResourceKey, ResourceKind,
    };
    use agentcore_sweep_test_utils::{BackendCall, FakeBackend};

    fn secrets(ids: &[&str]) -> Inventory {
        Inventory::from_resources(
            "test",
            ids.iter()
                .map(|id| ResourceRef::new(ResourceKind::Secret, *id, *id)),
        )
        .unwrap()
    }

    fn config(concurrency: usize) -> ExecutorConfig {
        ExecutorConfig {
            concurrency,
            ..Default::default()
        }
    }

    async fn run(
        backend: FakeBackend,
        inventory: &Inventory,
        config: ExecutorConfig,
        cancel: &CancellationToken,
    ) -> (Arc<FakeBackend>, Vec<Outcome>) {
        let graph = build_graph(inventory, DEPENDENCY_RULES).unwrap();
        let plan = plan(inventory, &graph).unwrap();
        let backend = Arc::new(backend);
        let outcomes = Executor::new(Arc::clone(&backend), config)
            .execute(&plan, &graph, cancel)
            .await;
        (backend, outcomes)
    }

    #[tokio::test]
    async fn test_sequential_dispatch_follows_plan() {
        let backend = FakeBackend::new()
            .with_resource(ResourceKind::Secret, "a")
            .with_resource(ResourceKind::Secret, "b")
            .with_resource(ResourceKind::Secret, "c");
        let inventory = secrets(&["c", "a", "b"]);

        let (backend, outcomes) =
            run(backend, &inventory, config(1), &CancellationToken::new()).await;

        let ids: Vec<_> = backend.delete_calls().into_iter().map(|k| k.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(outcomes.iter().all(|o| o.status == OutcomeStatus::Deleted));
        assert_eq!(backend.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut backend = FakeBackend::new().with_delete_delay(Duration::from_millis(100));
        for id in ids {
            backend = backend.with_resource(ResourceKind::Secret, id);
        }

        let (backend, outcomes) =
            run(backend, &secrets(&ids), config(3), &CancellationToken::new()).await;

        assert_eq!(outcomes.len(), ids.len());
        assert_eq!(backend.max_in_flight(), 3);
        assert!(backend.remaining().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded() {
        let key = ResourceKey::new(ResourceKind::Secret, "boom");
        let backend = FakeBackend::new()
            .with_resource(ResourceKind::Secret, "boom")
            .with_resource(ResourceKind::Secret, "fine")
            .panic_on_delete(key);

        let (_, outcomes) = run(
            backend,
            &secrets(&["boom", "fine"]),
            config(2),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcomes[0].status, OutcomeStatus::Failed);
        assert!(outcomes[0].detail.contains("worker panicked"));
        assert_eq!(outcomes[1].status, OutcomeStatus::Deleted);
    }

    #[tokio::test]
    async fn test_failure_detail_carries_suggestion() {
        let key = ResourceKey::new(ResourceKind::Secret, "locked");
        let backend = FakeBackend::new()
            .with_resource(ResourceKind::Secret, "locked")
            .fail_delete(key, AwsError::AccessDenied("secretsmanager:DeleteSecret".into()));

        let (_, outcomes) =
            run(backend, &secrets(&["locked"]), config(1), &CancellationToken::new()).await;

        assert_eq!(outcomes[0].status, OutcomeStatus::Failed);
        assert_eq!(outcomes[0].attempts, 1);
        assert!(outcomes[0].detail.starts_with("access denied: secretsmanager:DeleteSecret"));
        assert!(outcomes[0].detail.contains("Check that the active credentials"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timeout_stops_dispatch() {
        let backend = FakeBackend::new()
            .with_resource(ResourceKind::Secret, "a")
            .with_resource(ResourceKind::Secret, "b")
            .with_delete_delay(Duration::from_secs(10));
        let config = ExecutorConfig {
            concurrency: 1,
            run_timeout: Duration::from_secs(5),
            ..Default::default()
        };

        let (backend, outcomes) =
            run(backend, &secrets(&["a", "b"]), config, &CancellationToken::new()).await;

        assert_eq!(outcomes[0].status, OutcomeStatus::Deleted);
        assert_eq!(outcomes[1].status, OutcomeStatus::Failed);
        assert_eq!(outcomes[1].detail, "not attempted: run timed out");
        assert_eq!(outcomes[1].attempts, 0);
        assert!(!backend
            .calls()
            .contains(&BackendCall::DeleteStarted(ResourceKey::new(ResourceKind::Secret, "b"))));
    }

    #[tokio::test]
    async fn test_panicking_target_still_unblocks_gateway() {
        let target = ResourceKey::child(ResourceKind::GatewayTarget, "gw", "t");
        let backend = FakeBackend::new()
            .with_resource(ResourceKind::Gateway, "gw")
            .with_child(ResourceKind::GatewayTarget, "gw", "t")
            .panic_on_delete(target.clone());
        let inventory = Inventory::from_resources(
            "test",
            vec![
                ResourceRef::new(ResourceKind::Gateway, "gw", "gw"),
                ResourceRef::new(ResourceKind::GatewayTarget, target.id.clone(), "t")
                    .with_dependency(ResourceKey::new(ResourceKind::Gateway, "gw")),
            ],
        )
        .unwrap();

        let (backend, outcomes) =
            run(backend, &inventory, config(1), &CancellationToken::new()).await;

        assert_eq!(outcomes[0].resource.kind, ResourceKind::GatewayTarget);
        assert_eq!(outcomes[0].status, OutcomeStatus::Failed);
        assert!(outcomes[0].detail.starts_with("worker panicked"));
        assert_eq!(outcomes[1].resource.kind, ResourceKind::Gateway);
        assert_eq!(outcomes[1].status, OutcomeStatus::Deleted);
        assert_eq!(backend.remaining(), vec![target]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timeout_ends_retries_in_flight() {
        let key = ResourceKey::new(ResourceKind::Secret, "busy");
        let backend = FakeBackend::new()
            .with_resource(ResourceKind::Secret, "busy")
            .fail_delete(key.clone(), AwsError::Throttled("slow down".into()));
        let config = ExecutorConfig {
            concurrency: 1,
            retry: RetryPolicy {
                max_attempts: 10,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(2),
                ..Default::default()
            },
            run_timeout: Duration::from_secs(3),
        };

        let (backend, outcomes) =
            run(backend, &secrets(&["busy"]), config, &CancellationToken::new()).await;

        assert_eq!(outcomes[0].status, OutcomeStatus::Failed);
        assert_eq!(backend.delete_count(&key), 2);
        assert_eq!(outcomes[0].attempts, 2);
    }
}
