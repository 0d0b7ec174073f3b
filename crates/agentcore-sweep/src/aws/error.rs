//! Classification of AWS SDK failures
//!
//! Service errors are classified by their error code (see
//! [`classify_aws_error`]); failures that never produced a service response
//! are mapped from the SDK error variant.

use agentcore_sweep_common::{AwsError, classify_aws_error};
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Classify any AWS SDK operation error.
///
/// All service crates share the smithy `SdkError` type, so this works for
/// every client the backend uses.
pub fn classify_sdk_error<E, R>(err: &SdkError<E, R>) -> AwsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match err {
        SdkError::TimeoutError(_) => AwsError::Timeout(DisplayErrorContext(err).to_string()),
        SdkError::DispatchFailure(_) => AwsError::Transport(DisplayErrorContext(err).to_string()),
        SdkError::ServiceError(_) | SdkError::ResponseError(_) => {
            let message = err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(err).to_string());
            classify_aws_error(err.code(), Some(&message))
        }
        _ => AwsError::Sdk {
            code: err.code().map(str::to_string),
            message: DisplayErrorContext(err).to_string(),
        },
    }
}

/// Helper trait to classify SDK results inline with `?`
pub trait ClassifyExt<T> {
    fn classified(self) -> Result<T, AwsError>;
}

impl<T, E, R> ClassifyExt<T> for Result<T, SdkError<E, R>>
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn classified(self) -> Result<T, AwsError> {
        self.map_err(|e| classify_sdk_error(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_iam::config::http::HttpResponse;
    use aws_sdk_iam::operation::delete_role::DeleteRoleError;

    #[test]
    fn test_timeout_is_transient() {
        let err: SdkError<DeleteRoleError, HttpResponse> =
            SdkError::timeout_error("call exceeded deadline");
        let classified = classify_sdk_error(&err);
        assert!(matches!(classified, AwsError::Timeout(_)));
        assert!(classified.is_transient());
    }

    #[test]
    fn test_construction_failure_is_not_retried() {
        let err: SdkError<DeleteRoleError, HttpResponse> =
            SdkError::construction_failure("missing role name");
        let classified = classify_sdk_error(&err);
        assert!(matches!(classified, AwsError::Sdk { code: None, .. }));
        assert!(!classified.is_transient());
    }
}
