//! Backend abstraction over the resource-management APIs
//!
//! The scanner and executor only talk to a [`ResourceBackend`], so the
//! orchestration logic can be exercised against an in-memory backend in tests
//! and against AWS in production.

use crate::error::AwsError;
use crate::resource::{ResourceKey, ResourceRef};
use crate::resource_kind::ResourceKind;
use std::collections::HashMap;
use std::future::Future;

/// One entry returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListedResource {
    /// Identifier used by the delete API (for children: the child part only)
    pub id: String,
    /// Human-readable name, used for scope matching
    pub name: String,
    /// Tags, when the backend retrieved them
    pub tags: HashMap<String, String>,
}

impl ListedResource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// List and delete operations for every [`ResourceKind`].
///
/// Implementations must report a missing resource on delete as
/// [`AwsError::NotFound`] so that repeated runs stay idempotent.
pub trait ResourceBackend: Send + Sync {
    /// List live resources of `kind`.
    ///
    /// Child kinds are listed per parent: `parent` carries the key of the
    /// owning resource and is `None` for root kinds.
    fn list(
        &self,
        kind: ResourceKind,
        parent: Option<&ResourceKey>,
    ) -> impl Future<Output = Result<Vec<ListedResource>, AwsError>> + Send;

    /// Delete one resource
    fn delete(&self, resource: &ResourceRef) -> impl Future<Output = Result<(), AwsError>> + Send;
}
