//! Pipeline wiring: scan, graph and plan, then execute
//!
//! [`prepare`] is read-only and shared by `scan`, `preview` and `destroy`.
//! Any error it returns is fatal: the caller must not delete anything.

use crate::config::SweepConfig;
use crate::executor::{Executor, ExecutorConfig};
use crate::graph::{DependencyGraph, GraphError, build_graph};
use crate::planner::{CycleError, DeletionPlan, plan};
use crate::report::Summary;
use crate::scanner::{InventoryScanner, ScanError};
use agentcore_sweep_common::{
    DEPENDENCY_RULES, DependencyRule, DeploymentScope, Inventory, Outcome, ResourceBackend,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Pre-flight failure; nothing has been deleted
#[derive(Debug, Error)]
pub enum PreflightError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("inventory is inconsistent")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl PreflightError {
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            PreflightError::Scan(e) => e.suggestion(),
            PreflightError::Graph(_) => None,
            PreflightError::Cycle(_) => {
                Some("The deletion-order rules contradict each other; no resource was touched.")
            }
        }
    }
}

/// Read-only result of the pre-flight stages
#[derive(Debug, Clone)]
pub struct Prepared {
    pub inventory: Inventory,
    pub graph: DependencyGraph,
    pub plan: DeletionPlan,
}

/// Scan the configured scope and plan its deletion.
pub async fn prepare<B: ResourceBackend>(
    backend: &B,
    config: &SweepConfig,
) -> Result<Prepared, PreflightError> {
    prepare_with_rules(backend, &config.scope, DEPENDENCY_RULES, config.call_timeout()).await
}

/// [`prepare`] with an explicit rule table
#[instrument(skip_all, fields(scope = %scope))]
pub async fn prepare_with_rules<B: ResourceBackend>(
    backend: &B,
    scope: &DeploymentScope,
    rules: &[DependencyRule],
    call_timeout: Duration,
) -> Result<Prepared, PreflightError> {
    let inventory = InventoryScanner::new(backend, call_timeout)
        .scan(scope)
        .await?;
    let graph = build_graph(&inventory, rules)?;
    let plan = plan(&inventory, &graph)?;

    info!(
        resources = inventory.len(),
        edges = graph.edge_count(),
        "Deletion plan ready"
    );
    Ok(Prepared {
        inventory,
        graph,
        plan,
    })
}

/// Run the deletion plan; one outcome per step, in plan order.
pub async fn execute<B: ResourceBackend + 'static>(
    backend: Arc<B>,
    prepared: &Prepared,
    config: &ExecutorConfig,
    cancel: &CancellationToken,
) -> Vec<Outcome> {
    let started_at = chrono::Utc::now();
    let start = Instant::now();
    info!(
        started_at = %started_at.to_rfc3339(),
        steps = prepared.plan.len(),
        concurrency = config.concurrency,
        "Starting deletion run"
    );

    let outcomes = Executor::new(backend, config.clone())
        .execute(&prepared.plan, &prepared.graph, cancel)
        .await;

    let summary = Summary::from_outcomes(&outcomes);
    let elapsed_secs = start.elapsed().as_secs_f64();
    if summary.failed > 0 {
        warn!(
            deleted = summary.deleted,
            already_absent = summary.already_absent,
            failed = summary.failed,
            elapsed_secs,
            "Deletion run finished with failures"
        );
    } else {
        info!(
            deleted = summary.deleted,
            already_absent = summary.already_absent,
            elapsed_secs,
            "Deletion run finished"
        );
    }
    outcomes
}
