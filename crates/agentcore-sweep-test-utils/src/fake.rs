//! In-memory [`ResourceBackend`] for orchestration tests
//!
//! Holds a set of live resources, answers listings from them, and removes
//! them on delete. Failures, delays and panics can be scripted per resource,
//! and every call is recorded so tests can assert on order and concurrency.

use agentcore_sweep_common::resource::compose_child_id;
use agentcore_sweep_common::{
    AwsError, ListedResource, ResourceBackend, ResourceKey, ResourceKind, ResourceRef,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A call received by the fake backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    List {
        kind: ResourceKind,
        parent: Option<ResourceKey>,
    },
    DeleteStarted(ResourceKey),
    DeleteFinished(ResourceKey),
}

#[derive(Debug, Clone)]
struct FakeResource {
    kind: ResourceKind,
    parent_id: Option<String>,
    listed: ListedResource,
}

impl FakeResource {
    fn key(&self) -> ResourceKey {
        match &self.parent_id {
            Some(parent) => ResourceKey::child(self.kind, parent, &self.listed.id),
            None => ResourceKey::new(self.kind, self.listed.id.clone()),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    resources: BTreeMap<ResourceKey, FakeResource>,
    /// Errors returned by the next delete calls, consumed front to back
    scripted: HashMap<ResourceKey, VecDeque<AwsError>>,
    /// Errors returned by every delete call
    permanent: HashMap<ResourceKey, AwsError>,
    list_failures: HashMap<ResourceKind, AwsError>,
    panics: Vec<ResourceKey>,
    calls: Vec<BackendCall>,
    in_flight: usize,
    max_in_flight: usize,
    successful_deletes: usize,
}

/// Scriptable in-memory backend
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<State>,
    delete_delay: Option<Duration>,
    strict: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root resource whose name equals its id
    pub fn with_resource(self, kind: ResourceKind, id: &str) -> Self {
        self.with_listed(kind, None, ListedResource::new(id, id))
    }

    /// Add a child resource registered under `parent_id`
    pub fn with_child(self, kind: ResourceKind, parent_id: &str, id: &str) -> Self {
        self.with_listed(kind, Some(parent_id), ListedResource::new(id, id))
    }

    /// Add a resource with a fully specified listing entry
    pub fn with_listed(
        self,
        kind: ResourceKind,
        parent_id: Option<&str>,
        listed: ListedResource,
    ) -> Self {
        let resource = FakeResource {
            kind,
            parent_id: parent_id.map(str::to_string),
            listed,
        };
        self.lock().resources.insert(resource.key(), resource);
        self
    }

    /// Sleep this long inside every delete call
    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = Some(delay);
        self
    }

    /// Reject deleting a parent while any of its children still exist,
    /// the way the real services answer with a conflict
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Cancel `token` once `deletes` delete calls have succeeded
    pub fn cancel_after(mut self, deletes: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((deletes, token));
        self
    }

    /// Every delete of `key` fails with `error`
    pub fn fail_delete(self, key: ResourceKey, error: AwsError) -> Self {
        self.lock().permanent.insert(key, error);
        self
    }

    /// The next `times` deletes of `key` fail with `error`, later ones proceed
    pub fn fail_delete_times(self, key: ResourceKey, times: usize, error: AwsError) -> Self {
        self.lock()
            .scripted
            .entry(key)
            .or_default()
            .extend(std::iter::repeat_n(error, times));
        self
    }

    /// Every listing of `kind` fails with `error`
    pub fn fail_list(self, kind: ResourceKind, error: AwsError) -> Self {
        self.lock().list_failures.insert(kind, error);
        self
    }

    /// Deleting `key` panics inside the worker
    pub fn panic_on_delete(self, key: ResourceKey) -> Self {
        self.lock().panics.push(key);
        self
    }

    /// Keys of resources that are still live
    pub fn remaining(&self) -> Vec<ResourceKey> {
        self.lock().resources.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Keys passed to delete, in call order (repeats included)
    pub fn delete_calls(&self) -> Vec<ResourceKey> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::DeleteStarted(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of delete calls for one key
    pub fn delete_count(&self, key: &ResourceKey) -> usize {
        self.delete_calls().iter().filter(|k| *k == key).count()
    }

    /// Highest number of delete calls observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_delete(&self, key: &ResourceKey) -> Result<(), AwsError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::DeleteStarted(key.clone()));
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);

        if let Some(err) = state.permanent.get(key) {
            return Err(err.clone());
        }
        if let Some(err) = state.scripted.get_mut(key).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(())
    }

    fn finish_delete(&self, key: &ResourceKey) -> Result<(), AwsError> {
        let mut state = self.lock();
        if !state.resources.contains_key(key) {
            return Err(AwsError::NotFound(key.to_string()));
        }
        if self.strict {
            let has_children = state.resources.values().any(|r| {
                r.kind.parent_kind() == Some(key.kind) && r.parent_id.as_deref() == Some(&key.id)
            });
            if has_children {
                return Err(AwsError::Conflict(format!("{key} still has children")));
            }
        }
        state.resources.remove(key);
        state.successful_deletes += 1;

        if let Some((after, token)) = &self.cancel_after {
            if state.successful_deletes >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn end_delete(&self, key: &ResourceKey) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        state.calls.push(BackendCall::DeleteFinished(key.clone()));
    }
}

impl ResourceBackend for FakeBackend {
    async fn list(
        &self,
        kind: ResourceKind,
        parent: Option<&ResourceKey>,
    ) -> Result<Vec<ListedResource>, AwsError> {
        let mut state = self.lock();
        state.calls.push(BackendCall::List {
            kind,
            parent: parent.cloned(),
        });
        if let Some(err) = state.list_failures.get(&kind) {
            return Err(err.clone());
        }

        let parent_id = parent.map(|p| p.id.as_str());
        Ok(state
            .resources
            .values()
            .filter(|r| r.kind == kind && r.parent_id.as_deref() == parent_id)
            .map(|r| r.listed.clone())
            .collect())
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<(), AwsError> {
        let key = resource.key();
        let should_panic = self.lock().panics.contains(&key);

        let result = match self.begin_delete(&key) {
            Ok(()) => {
                if let Some(delay) = self.delete_delay {
                    tokio::time::sleep(delay).await;
                }
                if should_panic {
                    self.end_delete(&key);
                    panic!("injected panic while deleting {key}");
                }
                self.finish_delete(&key)
            }
            Err(e) => Err(e),
        };
        self.end_delete(&key);
        result
    }
}

/// Compound id of a child resource, as the scanner builds it
pub fn child_id(parent_id: &str, child_id: &str) -> String {
    compose_child_id(parent_id, child_id)
}
