//! AWS resource kinds created by the AgentCore gateway demo
//!
//! The set is closed: adding a kind means extending this enum, the rule table
//! in [`crate::rules`] and the scope markers in [`crate::scope`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kinds of AWS resources managed by agentcore-sweep
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// Bedrock AgentCore gateway
    Gateway,
    /// Target registered under a gateway (must be removed before the gateway)
    GatewayTarget,
    /// AgentCore API-key credential provider used by targets
    CredentialProvider,
    /// Cognito user pool backing the gateway's inbound authorizer
    UserPool,
    /// Hosted domain attached to a user pool
    UserPoolDomain,
    /// IAM role (gateway or Lambda execution role)
    IamRole,
    /// Gateway proxy Lambda function
    LambdaFunction,
    /// Secrets Manager secret
    Secret,
}

impl ResourceKind {
    /// Every kind, in declaration order
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Gateway,
        ResourceKind::GatewayTarget,
        ResourceKind::CredentialProvider,
        ResourceKind::UserPool,
        ResourceKind::UserPoolDomain,
        ResourceKind::IamRole,
        ResourceKind::LambdaFunction,
        ResourceKind::Secret,
    ];

    /// Stable kebab-case name used in reports and on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Gateway => "gateway",
            ResourceKind::GatewayTarget => "gateway-target",
            ResourceKind::CredentialProvider => "credential-provider",
            ResourceKind::UserPool => "user-pool",
            ResourceKind::UserPoolDomain => "user-pool-domain",
            ResourceKind::IamRole => "iam-role",
            ResourceKind::LambdaFunction => "lambda-function",
            ResourceKind::Secret => "secret",
        }
    }

    /// Kind whose instances own instances of this kind.
    ///
    /// Child resources can only be listed through their parent, and their
    /// identifiers are compound (`parent-id:child-id`).
    pub fn parent_kind(self) -> Option<ResourceKind> {
        match self {
            ResourceKind::GatewayTarget => Some(ResourceKind::Gateway),
            ResourceKind::UserPoolDomain => Some(ResourceKind::UserPool),
            _ => None,
        }
    }

    /// Kinds listed through a parent of this kind
    pub fn child_kinds(self) -> impl Iterator<Item = ResourceKind> {
        Self::ALL
            .into_iter()
            .filter(move |k| k.parent_kind() == Some(self))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an unrecognised kind name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resource kind '{}' (expected one of: {})", .0, known_kinds())]
pub struct UnknownKind(pub String);

fn known_kinds() -> String {
    ResourceKind::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}
