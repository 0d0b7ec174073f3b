//! Dependency grapher
//!
//! Turns an inventory plus the static rule table into "must be deleted
//! before" edges. No I/O.

use agentcore_sweep_common::rules::rule_for;
use agentcore_sweep_common::{DependencyRule, Inventory, Linkage, ResourceKey};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// Malformed dependency data in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{resource} depends on {missing}, which is not in the inventory")]
    MissingDependency {
        resource: ResourceKey,
        missing: ResourceKey,
    },
}

/// Directed graph over inventory keys; an edge `a -> b` means `a` must be
/// deleted before `b`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    successors: BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
    predecessors: BTreeMap<ResourceKey, BTreeSet<ResourceKey>>,
}

impl DependencyGraph {
    fn add_node(&mut self, key: ResourceKey) {
        self.successors.entry(key.clone()).or_default();
        self.predecessors.entry(key).or_default();
    }

    fn add_edge(&mut self, before: &ResourceKey, after: &ResourceKey) {
        if let Some(out) = self.successors.get_mut(before) {
            out.insert(after.clone());
        }
        if let Some(inc) = self.predecessors.get_mut(after) {
            inc.insert(before.clone());
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResourceKey> {
        self.successors.keys()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.successors.contains_key(key)
    }

    /// Resources that must wait for `key` to be deleted
    pub fn successors<'a>(
        &'a self,
        key: &ResourceKey,
    ) -> impl Iterator<Item = &'a ResourceKey> + use<'a> {
        self.successors.get(key).into_iter().flatten()
    }

    /// Resources that must be deleted before `key`
    pub fn predecessors<'a>(
        &'a self,
        key: &ResourceKey,
    ) -> impl Iterator<Item = &'a ResourceKey> + use<'a> {
        self.predecessors.get(key).into_iter().flatten()
    }

    pub fn has_edge(&self, before: &ResourceKey, after: &ResourceKey) -> bool {
        self.successors
            .get(before)
            .is_some_and(|out| out.contains(after))
    }

    /// All edges as `(before, after)`, in key order
    pub fn edges(&self) -> impl Iterator<Item = (&ResourceKey, &ResourceKey)> {
        self.successors
            .iter()
            .flat_map(|(before, out)| out.iter().map(move |after| (before, after)))
    }

    pub fn edge_count(&self) -> usize {
        self.successors.values().map(BTreeSet::len).sum()
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }
}

/// Derive the deletion-order graph for an inventory.
///
/// Declared rules add an edge only where the `before` resource names the
/// `after` resource; all-pairs rules order every in-scope pair of the two
/// kinds. A declared dependency with no rule for its kind pair is ignored.
pub fn build_graph(
    inventory: &Inventory,
    rules: &[DependencyRule],
) -> Result<DependencyGraph, GraphError> {
    let mut graph = DependencyGraph::default();
    for key in inventory.keys() {
        graph.add_node(key.clone());
    }

    for resource in inventory.iter() {
        let key = resource.key();
        for dep in &resource.depends_on {
            if !inventory.contains(dep) {
                return Err(GraphError::MissingDependency {
                    resource: key,
                    missing: dep.clone(),
                });
            }
            let declared = rule_for(rules, resource.kind, dep.kind)
                .is_some_and(|rule| rule.linkage == Linkage::Declared);
            if declared {
                graph.add_edge(&key, dep);
            }
        }
    }

    for rule in rules.iter().filter(|r| r.linkage == Linkage::AllPairs) {
        for before in inventory.of_kind(rule.before) {
            for after in inventory.of_kind(rule.after) {
                graph.add_edge(&before.key(), &after.key());
            }
        }
    }

    debug!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        "Dependency graph built"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentcore_sweep_common::{DEPENDENCY_RULES, ResourceKind, ResourceRef};

    fn key(kind: ResourceKind, id: &str) -> ResourceKey {
        ResourceKey::new(kind, id)
    }

    #[test]
    fn test_declared_edge_follows_depends_on() {
        let gw = key(ResourceKind::Gateway, "gw");
        let inventory = Inventory::from_resources(
            "test",
            vec![
                ResourceRef::new(ResourceKind::Gateway, "gw", "gw"),
                ResourceRef::new(ResourceKind::GatewayTarget, "gw:t", "t")
                    .with_dependency(gw.clone()),
                ResourceRef::new(ResourceKind::Gateway, "other", "other"),
            ],
        )
        .unwrap();

        let graph = build_graph(&inventory, DEPENDENCY_RULES).unwrap();
        let target = key(ResourceKind::GatewayTarget, "gw:t");
        assert!(graph.has_edge(&target, &gw));
        assert!(!graph.has_edge(&target, &key(ResourceKind::Gateway, "other")));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_all_pairs_rule_orders_every_pair() {
        let inventory = Inventory::from_resources(
            "test",
            vec![
                ResourceRef::new(ResourceKind::LambdaFunction, "f1", "f1"),
                ResourceRef::new(ResourceKind::LambdaFunction, "f2", "f2"),
                ResourceRef::new(ResourceKind::IamRole, "r1", "r1"),
            ],
        )
        .unwrap();

        let graph = build_graph(&inventory, DEPENDENCY_RULES).unwrap();
        let role = key(ResourceKind::IamRole, "r1");
        assert!(graph.has_edge(&key(ResourceKind::LambdaFunction, "f1"), &role));
        assert!(graph.has_edge(&key(ResourceKind::LambdaFunction, "f2"), &role));
        assert_eq!(graph.predecessors(&role).count(), 2);
    }

    #[test]
    fn test_missing_dependency_is_rejected() {
        let gone = key(ResourceKind::Gateway, "gone");
        let inventory = Inventory::from_resources(
            "test",
            vec![
                ResourceRef::new(ResourceKind::GatewayTarget, "gone:t", "t")
                    .with_dependency(gone.clone()),
            ],
        )
        .unwrap();

        let err = build_graph(&inventory, DEPENDENCY_RULES).unwrap_err();
        assert_eq!(
            err,
            GraphError::MissingDependency {
                resource: key(ResourceKind::GatewayTarget, "gone:t"),
                missing: gone,
            }
        );
    }

    #[test]
    fn test_dependency_without_rule_is_independent() {
        let secret = key(ResourceKind::Secret, "s");
        let inventory = Inventory::from_resources(
            "test",
            vec![
                ResourceRef::new(ResourceKind::IamRole, "r", "r").with_dependency(secret.clone()),
                ResourceRef::new(ResourceKind::Secret, "s", "s"),
            ],
        )
        .unwrap();

        let graph = build_graph(&inventory, DEPENDENCY_RULES).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_edges_in_key_order() {
        let inventory = Inventory::from_resources(
            "test",
            vec![
                ResourceRef::new(ResourceKind::Gateway, "gw", "gw"),
                ResourceRef::new(ResourceKind::UserPool, "pool", "pool"),
                ResourceRef::new(ResourceKind::IamRole, "role", "role"),
            ],
        )
        .unwrap();

        let graph = build_graph(&inventory, DEPENDENCY_RULES).unwrap();
        let edges: Vec<_> = graph.edges().map(|(a, b)| (a.to_string(), b.to_string())).collect();
        assert_eq!(
            edges,
            vec![
                ("gateway/gw".to_string(), "user-pool/pool".to_string()),
                ("gateway/gw".to_string(), "iam-role/role".to_string()),
            ]
        );
    }
}
