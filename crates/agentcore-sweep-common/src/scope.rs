//! Deployment scope: which live resources belong to one demo deployment
//!
//! The demo's setup scripts do not tag everything they create, so the default
//! selector recognises resources by per-kind name markers. A name prefix or
//! tag can be used instead when the deployment was created with one.
//!
//! ## Default markers
//!
//! | Kind | Name contains (case-insensitive) |
//! |------|----------------------------------|
//! | gateway | `gateway`, `cortex`, `multitarget`, `agentcore` |
//! | credential-provider | `snowflakecortextarget`, `wikipediatarget`, `apikey` |
//! | user-pool | `agentcore`, `gateway`, `multitarget` |
//! | iam-role | `agentcore`, `gateway` (or exactly `AgentCoreGatewayExecutionRole`) |
//! | lambda-function | `gateway_proxy`, `agentcore` |
//! | secret | `agentcore`, `gateway`, `snowflakecortextarget`, `wikipediatarget` |
//!
//! Child kinds (gateway targets, user pool domains) are in scope whenever
//! their parent is.

use crate::backend::ListedResource;
use crate::resource_kind::ResourceKind;
use std::collections::BTreeSet;
use std::fmt;

/// Execution role created by the gateway setup script
pub const GATEWAY_EXECUTION_ROLE: &str = "AgentCoreGatewayExecutionRole";

/// IAM role name prefixes that are never deleted (service-linked/platform roles)
const PROTECTED_ROLE_PREFIXES: &[&str] = &["AWS", "AmazonSageMaker"];

/// IAM role name fragments that are never deleted
const PROTECTED_ROLE_FRAGMENTS: &[&str] = &["ServiceRole"];

/// Case-insensitive name markers for a root kind
pub fn markers(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Gateway => &["gateway", "cortex", "multitarget", "agentcore"],
        ResourceKind::CredentialProvider => &["snowflakecortextarget", "wikipediatarget", "apikey"],
        ResourceKind::UserPool => &["agentcore", "gateway", "multitarget"],
        ResourceKind::IamRole => &["agentcore", "gateway"],
        ResourceKind::LambdaFunction => &["gateway_proxy", "agentcore"],
        ResourceKind::Secret => &[
            "agentcore",
            "gateway",
            "snowflakecortextarget",
            "wikipediatarget",
        ],
        ResourceKind::GatewayTarget | ResourceKind::UserPoolDomain => &[],
    }
}

/// Whether a resource name is protected from deletion regardless of scope
pub fn is_protected(kind: ResourceKind, name: &str) -> bool {
    match kind {
        ResourceKind::IamRole => {
            PROTECTED_ROLE_PREFIXES.iter().any(|p| name.starts_with(p))
                || PROTECTED_ROLE_FRAGMENTS.iter().any(|f| name.contains(f))
        }
        _ => false,
    }
}

/// How scope membership is decided for root resources
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeSelector {
    /// Per-kind name markers from the demo's setup scripts
    #[default]
    Markers,
    /// Name starts with this prefix (case-sensitive). A blank prefix
    /// selects nothing.
    Prefix(String),
    /// Resource carries this tag
    Tag { key: String, value: String },
}

/// Deployment scope: selector plus resource-kind allowlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentScope {
    pub selector: ScopeSelector,
    pub kinds: BTreeSet<ResourceKind>,
}

impl Default for DeploymentScope {
    fn default() -> Self {
        Self {
            selector: ScopeSelector::Markers,
            kinds: ResourceKind::ALL.into_iter().collect(),
        }
    }
}

impl DeploymentScope {
    pub fn new(selector: ScopeSelector) -> Self {
        Self {
            selector,
            ..Default::default()
        }
    }

    /// Restrict the scope to the given kinds. An empty list keeps all kinds.
    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        let kinds: BTreeSet<_> = kinds.into_iter().collect();
        if !kinds.is_empty() {
            self.kinds = kinds;
        }
        self
    }

    /// Whether resources of this kind may enter the inventory
    pub fn includes(&self, kind: ResourceKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Whether this kind must be listed, either for itself or to reach
    /// allowlisted children
    pub fn needs_listing(&self, kind: ResourceKind) -> bool {
        self.includes(kind) || kind.child_kinds().any(|c| self.includes(c))
    }

    /// Whether the backend has to fetch tags for this scope
    pub fn needs_tags(&self) -> bool {
        matches!(self.selector, ScopeSelector::Tag { .. })
    }

    /// Decide membership for a listed root resource
    pub fn matches(&self, kind: ResourceKind, listed: &ListedResource) -> bool {
        if is_protected(kind, &listed.name) {
            return false;
        }

        match &self.selector {
            ScopeSelector::Markers => {
                if kind == ResourceKind::IamRole && listed.name == GATEWAY_EXECUTION_ROLE {
                    return true;
                }
                let name = listed.name.to_lowercase();
                markers(kind).iter().any(|m| name.contains(m))
            }
            ScopeSelector::Prefix(prefix) => {
                !prefix.trim().is_empty() && listed.name.starts_with(prefix.as_str())
            }
            ScopeSelector::Tag { key, value } => listed.tags.get(key) == Some(value),
        }
    }

    /// Stable description for report headers
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeploymentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            ScopeSelector::Markers => f.write_str("demo name markers")?,
            ScopeSelector::Prefix(p) => write!(f, "name prefix '{p}'")?,
            ScopeSelector::Tag { key, value } => write!(f, "tag {key}={value}")?,
        }
        if self.kinds.len() != ResourceKind::ALL.len() {
            let kinds: Vec<_> = self.kinds.iter().map(|k| k.as_str()).collect();
            write!(f, " [kinds: {}]", kinds.join(","))?;
        }
        Ok(())
    }
}
