//! AWS client modules
//!
//! This module provides the production backend over:
//! - Bedrock AgentCore control plane: gateways, targets, credential providers
//! - Cognito: user pools and their hosted domains
//! - IAM: gateway and Lambda execution roles
//! - Lambda: gateway proxy functions
//! - Secrets Manager: API-key secrets
//! - STS: account ID lookup for the credential pre-check

pub mod account;
pub mod backend;
pub mod context;
pub mod error;
pub mod tags;

pub use account::{AccountId, CredentialError, get_current_account_id};
pub use backend::AwsBackend;
pub use context::{AwsContext, FromAwsContext};
pub use error::{ClassifyExt, classify_sdk_error};
