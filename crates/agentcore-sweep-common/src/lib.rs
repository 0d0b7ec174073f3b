//! agentcore-sweep-common - Shared types for the cleanup orchestrator
//!
//! This crate holds the resource model and the static domain knowledge
//! (deletion-order rules, scope markers, error codes) without any AWS SDK
//! dependencies, so test backends can build against it directly.
//!
//! ## Modules
//!
//! - [`backend`]: The list/delete abstraction the orchestrator drives
//! - [`defaults`]: Default configuration values
//! - [`error`]: AWS error classification by error code
//! - [`outcome`]: Per-resource results of a live run
//! - [`resource`]: Resource keys, descriptors and the inventory snapshot
//! - [`resource_kind`]: The closed set of resource kinds
//! - [`rules`]: Kind-pair deletion-order rule table
//! - [`scope`]: Deployment scope matching

pub mod backend;
pub mod defaults;
pub mod error;
pub mod outcome;
pub mod resource;
pub mod resource_kind;
pub mod rules;
pub mod scope;

// Re-export commonly used types
pub use backend::{ListedResource, ResourceBackend};
pub use error::{AwsError, classify_aws_error};
pub use outcome::{Outcome, OutcomeStatus};
pub use resource::{DuplicateResource, Inventory, ResourceKey, ResourceRef};
pub use resource_kind::ResourceKind;
pub use rules::{DEPENDENCY_RULES, DependencyRule, Linkage};
pub use scope::{DeploymentScope, ScopeSelector};
