//! AWS test utilities
//!
//! Provides region detection and unique scope prefixes for live AWS tests.

use agentcore_sweep_common::defaults::DEFAULT_REGION;
use chrono::Utc;

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-west-2
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| DEFAULT_REGION.to_string())
}

/// Generate a name prefix no real deployment uses.
///
/// Format: `sweep-test-{timestamp_ms}-{counter}-`. Scoping a live run to it
/// guarantees the run sees an empty inventory.
pub fn test_scope_prefix() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("sweep-test-{ts}-{counter}-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_test_region_default() {
        let original_region = std::env::var("AWS_REGION").ok();
        let original_default = std::env::var("AWS_DEFAULT_REGION").ok();

        // SAFETY: Test-only code; no other test in this crate reads these vars.
        unsafe {
            std::env::remove_var("AWS_REGION");
            std::env::remove_var("AWS_DEFAULT_REGION");
        }

        assert_eq!(get_test_region(), "us-west-2");

        unsafe {
            if let Some(r) = original_region {
                std::env::set_var("AWS_REGION", r);
            }
            if let Some(r) = original_default {
                std::env::set_var("AWS_DEFAULT_REGION", r);
            }
        }
    }

    #[test]
    fn test_scope_prefix_format() {
        let prefix = test_scope_prefix();
        let body = prefix
            .strip_prefix("sweep-test-")
            .and_then(|s| s.strip_suffix('-'))
            .unwrap();
        let parts: Vec<&str> = body.split('-').collect();
        assert_eq!(parts.len(), 2);
        parts[0].parse::<i64>().expect("Should be valid timestamp");
        parts[1].parse::<u32>().expect("Should be valid counter");
    }

    #[test]
    fn test_scope_prefix_unique() {
        assert_ne!(test_scope_prefix(), test_scope_prefix());
    }
}
