//! Default configuration values
//!
//! Shared by the CLI argument definitions and the library config types so
//! both agree on what an unconfigured run does.

use std::time::Duration;

/// Region the demo's setup scripts deploy into
pub const DEFAULT_REGION: &str = "us-west-2";

/// Concurrent delete calls for resources with no ordering between them
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Total delete attempts per resource for transient failures
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Per-call timeout in seconds for list/delete calls
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Overall timeout in seconds for the deletion phase
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 900;

/// First backoff delay between retried delete attempts
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_millis(500);

/// Cap on the backoff delay between retried delete attempts
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

/// Token the operator must type to authorize destructive mode
pub const CONFIRMATION_TOKEN: &str = "DELETE";
