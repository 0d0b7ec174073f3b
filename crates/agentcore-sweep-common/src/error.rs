//! Classification of AWS API failures
//!
//! Errors are classified from the service error code rather than by matching
//! on Debug output. The executor only cares about two questions: is the
//! resource already gone, and is another attempt worthwhile.

use thiserror::Error;

/// AWS error categories for retry and idempotent-delete logic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AwsError {
    /// Resource does not exist (an idempotent delete treats this as success)
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded (retryable with backoff)
    #[error("rate limit exceeded: {0}")]
    Throttled(String),

    /// Call did not complete within its deadline (retryable)
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Request never reached the service (retryable)
    #[error("transport failure: {0}")]
    Transport(String),

    /// Service-side fault (retryable)
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Caller lacks permission for the operation
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Resource is in use or in a state that forbids the operation
    #[error("resource in conflicting state: {0}")]
    Conflict(String),

    /// Request was malformed (e.g. a compound id without its parent)
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Any other AWS SDK error with code and message
    #[error("AWS error{}: {message}", code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound(_))
    }

    /// Check if another attempt could succeed without operator action
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AwsError::Throttled(_)
                | AwsError::Timeout(_)
                | AwsError::Transport(_)
                | AwsError::Unavailable(_)
        )
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AwsError::AccessDenied(_) => Some(
                "Check that the active credentials allow list/delete on this resource type.",
            ),
            AwsError::Conflict(_) => Some(
                "Another resource still references this one; re-run once it is gone or remove it manually.",
            ),
            AwsError::Throttled(_) => {
                Some("AWS API rate limit hit. Lower --concurrency or re-run later.")
            }
            _ => None,
        }
    }
}

/// Known AWS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFoundException",
    "ResourceNotFound",
    "NoSuchEntity",
    "NotFoundException",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
];

/// Known AWS error codes for server-side faults
const UNAVAILABLE_CODES: &[&str] = &[
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "InternalServerException",
    "InternalFailure",
    "InternalErrorException",
    "ServiceFailure",
];

/// Known AWS error codes for missing permissions
const ACCESS_DENIED_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnauthorizedOperation",
    "NotAuthorizedException",
];

/// Known AWS error codes for resources still in use
const CONFLICT_CODES: &[&str] = &[
    "ConflictException",
    "DeleteConflict",
    "DependencyViolation",
    "ResourceConflictException",
    "ResourceInUseException",
];

/// Classify an AWS SDK error using the error code.
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => AwsError::NotFound(message),
        Some(c) if THROTTLING_CODES.contains(&c) => AwsError::Throttled(message),
        Some(c) if UNAVAILABLE_CODES.contains(&c) => AwsError::Unavailable(message),
        Some(c) if ACCESS_DENIED_CODES.contains(&c) => AwsError::AccessDenied(message),
        Some(c) if CONFLICT_CODES.contains(&c) => AwsError::Conflict(message),
        _ => AwsError::Sdk {
            code: code.map(|s| s.to_string()),
            message,
        },
    }
}
