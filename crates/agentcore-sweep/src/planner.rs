//! Deletion planner
//!
//! Kahn's algorithm over the dependency graph. The ready set is ordered by
//! [`ResourceKey`], so the same inventory always yields the same plan.

use crate::graph::DependencyGraph;
use agentcore_sweep_common::{Inventory, ResourceKey, ResourceRef};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// The dependency graph has at least one cycle; nothing may be deleted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "dependency cycle among {} resource(s): {}",
    .participants.len(),
    join_keys(.participants)
)]
pub struct CycleError {
    /// Resources on or between cycles, sorted
    pub participants: Vec<ResourceKey>,
}

fn join_keys(keys: &[ResourceKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered deletion steps; every graph edge `a -> b` has `a` before `b`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    scope: String,
    steps: Vec<ResourceRef>,
    positions: BTreeMap<ResourceKey, usize>,
}

impl DeletionPlan {
    fn new(scope: String, steps: Vec<ResourceRef>) -> Self {
        let positions = steps
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key(), i))
            .collect();
        Self {
            scope,
            steps,
            positions,
        }
    }

    /// Label of the scope the plan was made for
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn steps(&self) -> &[ResourceRef] {
        &self.steps
    }

    pub fn position(&self, key: &ResourceKey) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Replay every edge of `graph` against this order
    pub fn respects(&self, graph: &DependencyGraph) -> bool {
        graph
            .edges()
            .all(|(before, after)| match (self.position(before), self.position(after)) {
                (Some(b), Some(a)) => b < a,
                _ => false,
            })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Order the inventory so every resource comes before what it blocks.
pub fn plan(inventory: &Inventory, graph: &DependencyGraph) -> Result<DeletionPlan, CycleError> {
    let mut in_degree: BTreeMap<&ResourceKey, usize> = inventory
        .keys()
        .map(|key| (key, graph.predecessors(key).count()))
        .collect();

    let mut ready: BTreeSet<&ResourceKey> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&key, _)| key)
        .collect();

    let mut steps = Vec::with_capacity(inventory.len());
    while let Some(key) = ready.pop_first() {
        if let Some(resource) = inventory.get(key) {
            steps.push(resource.clone());
        }
        for next in graph.successors(key) {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.insert(next);
                }
            }
        }
    }

    if steps.len() != inventory.len() {
        let placed: BTreeSet<ResourceKey> = steps.iter().map(ResourceRef::key).collect();
        let remaining = inventory.keys().filter(|k| !placed.contains(*k)).cloned();
        return Err(CycleError {
            participants: cycle_core(graph, remaining.collect()),
        });
    }

    debug!(steps = steps.len(), "Deletion plan computed");
    Ok(DeletionPlan::new(inventory.scope().to_string(), steps))
}

/// Strip nodes that cannot lie on a cycle: no incoming or no outgoing edge
/// within the remaining set. What survives is on or between cycles.
fn cycle_core(graph: &DependencyGraph, mut remaining: BTreeSet<ResourceKey>) -> Vec<ResourceKey> {
    loop {
        let prunable: Vec<ResourceKey> = remaining
            .iter()
            .filter(|key| {
                !graph.predecessors(key).any(|p| remaining.contains(p))
                    || !graph.successors(key).any(|s| remaining.contains(s))
            })
            .cloned()
            .collect();
        if prunable.is_empty() {
            break;
        }
        for key in &prunable {
            remaining.remove(key);
        }
    }
    remaining.into_iter().collect()
}
