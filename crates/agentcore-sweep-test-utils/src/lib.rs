//! Shared test utilities for agentcore-sweep
//!
//! This crate provides test helpers that depend only on the common crate,
//! so both unit and integration tests can use them without cycles.
//!
//! ## Modules
//!
//! - [`aws`]: AWS region detection and unique scope prefixes
//! - [`fake`]: Scriptable in-memory backend

pub mod aws;
pub mod fake;

// Re-export commonly used items
pub use aws::{get_test_region, test_scope_prefix};
pub use fake::{BackendCall, FakeBackend, child_id};
