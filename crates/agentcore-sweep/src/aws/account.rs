//! AWS account validation and identity

use super::context::AwsContext;
use thiserror::Error;
use tracing::info;

/// Strongly-typed AWS account ID (12-digit string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::Deref)]
pub struct AccountId(String);

impl AccountId {
    /// Create an AccountId for testing purposes
    #[cfg(test)]
    pub fn new(s: String) -> Self {
        AccountId(s)
    }
}

/// The caller identity could not be resolved, so nothing can be scanned
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to get AWS caller identity")]
    CallerIdentity(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("no account ID returned from STS GetCallerIdentity")]
    MissingAccount,
}

impl CredentialError {
    /// Operator guidance printed with the error
    pub fn suggestion(&self) -> &'static str {
        "Configure credentials (aws configure, AWS_PROFILE or --profile) for the account that holds the deployment."
    }
}

/// Fetch the current AWS account ID from credentials via STS GetCallerIdentity
///
/// This operation requires no special permissions, so it doubles as the
/// credential check before any listing.
pub async fn get_current_account_id(ctx: &AwsContext) -> Result<AccountId, CredentialError> {
    let identity = ctx
        .sts_client()
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| CredentialError::CallerIdentity(Box::new(e)))?;

    let account = identity.account().ok_or(CredentialError::MissingAccount)?;

    info!(account_id = %account, region = %ctx.region(), "AWS account validated");

    Ok(AccountId(account.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_display_and_deref() {
        let id = AccountId::new("123456789012".to_string());
        assert_eq!(id.to_string(), "123456789012");
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_credential_error_has_guidance() {
        assert!(CredentialError::MissingAccount.suggestion().contains("--profile"));
    }
}
