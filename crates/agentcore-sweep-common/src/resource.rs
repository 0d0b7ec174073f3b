//! Resource descriptors and the inventory snapshot

use crate::resource_kind::ResourceKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Separator between parent and child identifiers in compound ids
pub const CHILD_ID_SEPARATOR: char = ':';

/// Identity of a resource: `(kind, id)`.
///
/// The derived ordering (kind first, then id) is the deterministic tie-break
/// used by the planner and the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub id: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    /// Key of a child resource listed under `parent_id`
    pub fn child(kind: ResourceKind, parent_id: &str, child_id: &str) -> Self {
        Self::new(kind, compose_child_id(parent_id, child_id))
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Build a compound `parent:child` identifier
pub fn compose_child_id(parent_id: &str, child_id: &str) -> String {
    format!("{parent_id}{CHILD_ID_SEPARATOR}{child_id}")
}

/// Split a compound identifier into `(parent, child)`
pub fn split_child_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(CHILD_ID_SEPARATOR)
        .filter(|(parent, child)| !parent.is_empty() && !child.is_empty())
}

/// A deletable unit discovered in one deployment scope.
///
/// `depends_on` points in the deletion-predecessor direction: if this
/// resource names `B`, this resource must be deleted before `B`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<ResourceKey>,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            display_name: display_name.into(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Record that this resource must be deleted before `key`
    pub fn with_dependency(mut self, key: ResourceKey) -> Self {
        self.depends_on.insert(key);
        self
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.kind, self.id.clone())
    }

    /// `(parent, child)` parts of a compound child id
    pub fn child_id_parts(&self) -> Option<(&str, &str)> {
        split_child_id(&self.id)
    }
}

/// Raised when a snapshot would hold two different resources with one key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inventory already holds a different resource with key {key}")]
pub struct DuplicateResource {
    pub key: ResourceKey,
}

/// Immutable snapshot of the live resources in one deployment scope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    scope: String,
    resources: BTreeMap<ResourceKey, ResourceRef>,
}

impl Inventory {
    /// Build a snapshot, rejecting conflicting entries for the same key.
    ///
    /// Identical repeats (e.g. from overlapping listing pages) collapse into
    /// one entry.
    pub fn from_resources(
        scope: impl Into<String>,
        resources: impl IntoIterator<Item = ResourceRef>,
    ) -> Result<Self, DuplicateResource> {
        let mut map = BTreeMap::new();
        for resource in resources {
            let key = resource.key();
            match map.get(&key) {
                Some(existing) if existing == &resource => {}
                Some(_) => return Err(DuplicateResource { key }),
                None => {
                    map.insert(key, resource);
                }
            }
        }
        Ok(Self {
            scope: scope.into(),
            resources: map,
        })
    }

    /// Label of the deployment scope this snapshot was taken for
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceRef> {
        self.resources.get(key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.resources.contains_key(key)
    }

    /// Resources in key order
    pub fn iter(&self) -> impl Iterator<Item = &ResourceRef> {
        self.resources.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.resources.keys()
    }

    /// Resources of one kind, in id order
    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceRef> {
        self.resources.values().filter(move |r| r.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
