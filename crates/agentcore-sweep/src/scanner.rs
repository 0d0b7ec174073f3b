//! Inventory scanner: discovers the live resources of one deployment scope
//!
//! Root kinds are listed concurrently, filtered by the scope, and then the
//! child kinds are listed under each in-scope parent. Any listing failure
//! aborts the scan: a partial inventory could plan a parent deletion while
//! its unseen children still exist.

use agentcore_sweep_common::{
    AwsError, DeploymentScope, DuplicateResource, Inventory, ListedResource, ResourceBackend,
    ResourceKey, ResourceKind, ResourceRef,
};
use futures::future::try_join_all;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Why a scan could not produce an inventory
#[derive(Debug, Error)]
pub enum ScanCause {
    #[error("listing failed")]
    Listing(#[source] AwsError),

    #[error("listing returned two different resources with key {0}")]
    Conflicting(ResourceKey),
}

/// The inventory could not be built safely; nothing was deleted
#[derive(Debug, Error)]
#[error("scan of {kind} resources failed")]
pub struct ScanError {
    pub kind: ResourceKind,
    #[source]
    pub cause: ScanCause,
}

impl ScanError {
    fn listing(kind: ResourceKind, err: AwsError) -> Self {
        Self {
            kind,
            cause: ScanCause::Listing(err),
        }
    }

    /// Operator hint derived from the underlying AWS error
    pub fn suggestion(&self) -> Option<&'static str> {
        match &self.cause {
            ScanCause::Listing(err) => err.suggestion(),
            ScanCause::Conflicting(_) => None,
        }
    }
}

impl From<DuplicateResource> for ScanError {
    fn from(dup: DuplicateResource) -> Self {
        Self {
            kind: dup.key.kind,
            cause: ScanCause::Conflicting(dup.key),
        }
    }
}

/// Lists resources through a backend and assembles the scope's inventory
pub struct InventoryScanner<'a, B> {
    backend: &'a B,
    call_timeout: Duration,
}

impl<'a, B: ResourceBackend> InventoryScanner<'a, B> {
    pub fn new(backend: &'a B, call_timeout: Duration) -> Self {
        Self {
            backend,
            call_timeout,
        }
    }

    /// Build the inventory for `scope`. Read-only.
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn scan(&self, scope: &DeploymentScope) -> Result<Inventory, ScanError> {
        let root_kinds: Vec<_> = ResourceKind::ALL
            .into_iter()
            .filter(|k| k.parent_kind().is_none() && scope.needs_listing(*k))
            .collect();

        let roots = try_join_all(root_kinds.iter().map(|&kind| async move {
            let listed = self.list(kind, None).await?;
            let kept: Vec<_> = listed
                .into_iter()
                .filter(|entry| scope.matches(kind, entry))
                .collect();
            debug!(kind = %kind, matched = kept.len(), "Scoped root resources");
            Ok::<_, ScanError>((kind, kept))
        }))
        .await?;

        let mut resources = Vec::new();
        let mut parents = Vec::new();
        for (kind, entries) in roots {
            for entry in entries {
                let key = ResourceKey::new(kind, entry.id.clone());
                if kind.child_kinds().any(|c| scope.includes(c)) {
                    parents.push(key);
                }
                if scope.includes(kind) {
                    resources.push(ResourceRef::new(kind, entry.id, entry.name));
                }
            }
        }

        let child_jobs = parents.iter().flat_map(move |parent| {
            parent
                .kind
                .child_kinds()
                .filter(move |c| scope.includes(*c))
                .map(move |child_kind| (parent, child_kind))
        });
        let children = try_join_all(child_jobs.map(|(parent, child_kind)| async move {
            let listed = self.list(child_kind, Some(parent)).await?;
            Ok::<_, ScanError>(
                listed
                    .into_iter()
                    .map(|entry| child_ref(child_kind, parent, entry, scope))
                    .collect::<Vec<_>>(),
            )
        }))
        .await?;
        resources.extend(children.into_iter().flatten());

        let inventory = Inventory::from_resources(scope.label(), resources)?;
        info!(resources = inventory.len(), "Inventory scanned");
        Ok(inventory)
    }

    async fn list(
        &self,
        kind: ResourceKind,
        parent: Option<&ResourceKey>,
    ) -> Result<Vec<ListedResource>, ScanError> {
        match tokio::time::timeout(self.call_timeout, self.backend.list(kind, parent)).await {
            Ok(result) => result.map_err(|e| ScanError::listing(kind, e)),
            Err(_) => Err(ScanError::listing(
                kind,
                AwsError::Timeout(format!(
                    "listing {kind} did not finish within {:?}",
                    self.call_timeout
                )),
            )),
        }
    }
}

/// Descriptor for a child listed under `parent`
fn child_ref(
    kind: ResourceKind,
    parent: &ResourceKey,
    entry: ListedResource,
    scope: &DeploymentScope,
) -> ResourceRef {
    let key = ResourceKey::child(kind, &parent.id, &entry.id);
    let resource = ResourceRef::new(kind, key.id, entry.name);
    if scope.includes(parent.kind) {
        resource.with_dependency(parent.clone())
    } else {
        resource
    }
}
