//! Per-resource results of a live run

use crate::resource::ResourceRef;
use serde::Serialize;
use std::fmt;

/// Terminal status of one planned resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    /// Delete call succeeded
    Deleted,
    /// Resource was already gone (idempotent re-run)
    AlreadyAbsent,
    /// Delete failed, or was never attempted because the run stopped early
    Failed,
}

impl OutcomeStatus {
    /// Whether this status leaves the account clean for the resource
    pub fn is_success(self) -> bool {
        !matches!(self, OutcomeStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Deleted => "deleted",
            OutcomeStatus::AlreadyAbsent => "already absent",
            OutcomeStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result for one resource of the deletion plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub resource: ResourceRef,
    pub status: OutcomeStatus,
    pub detail: String,
    /// Delete calls issued (0 when not attempted)
    pub attempts: u32,
}

impl Outcome {
    pub fn deleted(resource: ResourceRef, attempts: u32) -> Self {
        Self {
            resource,
            status: OutcomeStatus::Deleted,
            detail: String::new(),
            attempts,
        }
    }

    pub fn already_absent(resource: ResourceRef, attempts: u32) -> Self {
        Self {
            resource,
            status: OutcomeStatus::AlreadyAbsent,
            detail: String::new(),
            attempts,
        }
    }

    pub fn failed(resource: ResourceRef, detail: impl Into<String>, attempts: u32) -> Self {
        Self {
            resource,
            status: OutcomeStatus::Failed,
            detail: detail.into(),
            attempts,
        }
    }

    /// Outcome for a resource the run never reached
    pub fn not_attempted(resource: ResourceRef, reason: &str) -> Self {
        Self::failed(resource, format!("not attempted: {reason}"), 0)
    }
}
