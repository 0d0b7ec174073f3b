//! [`ResourceBackend`] over the AWS service APIs
//!
//! One list and one delete routine per [`ResourceKind`]. Deletes report a
//! missing resource as [`AwsError::NotFound`] and never ignore other errors;
//! the executor decides what a failure means.

use super::context::{AwsContext, FromAwsContext};
use super::error::{ClassifyExt, classify_sdk_error};
use super::tags::{FieldText, extract_iam_tags, extract_secret_tags, map_tags};
use crate::wait::{WaitConfig, wait_for_resource};
use agentcore_sweep_common::{
    AwsError, ListedResource, ResourceBackend, ResourceKey, ResourceKind, ResourceRef,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Page size for Cognito `ListUserPools` (service maximum)
const USER_POOL_PAGE_SIZE: i32 = 60;

/// Upper bound on policies/profiles returned per role listing
const ROLE_DETAIL_PAGE_SIZE: i32 = 1000;

/// AWS-backed resource backend
pub struct AwsBackend {
    agentcore: aws_sdk_bedrockagentcorecontrol::Client,
    cognito: aws_sdk_cognitoidentityprovider::Client,
    iam: aws_sdk_iam::Client,
    lambda: aws_sdk_lambda::Client,
    secrets: aws_sdk_secretsmanager::Client,
    /// Fetch tags during listing (only needed for tag-based scopes)
    fetch_tags: bool,
    /// Polling for asynchronously deleted children
    wait: WaitConfig,
    cancel: Option<CancellationToken>,
}

impl FromAwsContext for AwsBackend {
    fn from_context(ctx: &AwsContext) -> Self {
        Self {
            agentcore: ctx.agentcore_client(),
            cognito: ctx.cognito_client(),
            iam: ctx.iam_client(),
            lambda: ctx.lambda_client(),
            secrets: ctx.secrets_client(),
            fetch_tags: false,
            wait: WaitConfig::default(),
            cancel: None,
        }
    }
}

impl AwsBackend {
    /// Fetch resource tags while listing
    pub fn with_tags(mut self, fetch_tags: bool) -> Self {
        self.fetch_tags = fetch_tags;
        self
    }

    /// Stop polling for child deletion once `token` fires
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    // ---- AgentCore gateways ----

    async fn list_gateways(&self) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = self
                .agentcore
                .list_gateways()
                .set_next_token(next_token.take())
                .send()
                .await
                .classified()?;

            for gw in resp.items() {
                listed.push(ListedResource::new(gw.gateway_id().text(), gw.name().text()));
            }

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        debug!(count = listed.len(), "Listed gateways");
        Ok(listed)
    }

    async fn list_gateway_targets(&self, gateway_id: &str) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = self
                .agentcore
                .list_gateway_targets()
                .gateway_identifier(gateway_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .classified()?;

            for target in resp.items() {
                listed.push(ListedResource::new(
                    target.target_id().text(),
                    target.name().text(),
                ));
            }

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        debug!(gateway_id = %gateway_id, count = listed.len(), "Listed gateway targets");
        Ok(listed)
    }

    async fn delete_gateway_target(&self, gateway_id: &str, target_id: &str) -> Result<(), AwsError> {
        self.agentcore
            .delete_gateway_target()
            .gateway_identifier(gateway_id)
            .target_id(target_id)
            .send()
            .await
            .classified()?;

        let client = self.agentcore.clone();
        wait_for_resource(
            self.wait.clone(),
            self.cancel.as_ref(),
            || {
                let client = client.clone();
                async move {
                    match client
                        .get_gateway_target()
                        .gateway_identifier(gateway_id)
                        .target_id(target_id)
                        .send()
                        .await
                    {
                        Ok(_) => Ok(false),
                        Err(e) => match classify_sdk_error(&e) {
                            err if err.is_not_found() => Ok(true),
                            err => Err(err),
                        },
                    }
                }
            },
            &format!("gateway target {gateway_id}:{target_id}"),
        )
        .await?;
        Ok(())
    }

    async fn delete_gateway(&self, gateway_id: &str) -> Result<(), AwsError> {
        self.agentcore
            .delete_gateway()
            .gateway_identifier(gateway_id)
            .send()
            .await
            .classified()?;
        Ok(())
    }

    // ---- AgentCore credential providers ----

    async fn list_credential_providers(&self) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = self
                .agentcore
                .list_api_key_credential_providers()
                .set_next_token(next_token.take())
                .send()
                .await
                .classified()?;

            for provider in resp.credential_providers() {
                let name = provider.name().text();
                listed.push(ListedResource::new(name.clone(), name));
            }

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        debug!(count = listed.len(), "Listed credential providers");
        Ok(listed)
    }

    async fn delete_credential_provider(&self, name: &str) -> Result<(), AwsError> {
        self.agentcore
            .delete_api_key_credential_provider()
            .name(name)
            .send()
            .await
            .classified()?;
        Ok(())
    }

    // ---- Cognito ----

    async fn list_user_pools(&self) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = self
                .cognito
                .list_user_pools()
                .max_results(USER_POOL_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .classified()?;

            for pool in resp.user_pools() {
                let Some(id) = pool.id() else { continue };
                let mut entry = ListedResource::new(id, pool.name().text());
                if self.fetch_tags {
                    let described = self
                        .cognito
                        .describe_user_pool()
                        .user_pool_id(id)
                        .send()
                        .await
                        .classified()?;
                    entry.tags = map_tags(
                        described
                            .user_pool()
                            .and_then(|p| p.user_pool_tags()),
                    );
                }
                listed.push(entry);
            }

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        debug!(count = listed.len(), "Listed user pools");
        Ok(listed)
    }

    /// Hosted domain of a pool, if it has one
    async fn user_pool_domain(&self, pool_id: &str) -> Result<Option<String>, AwsError> {
        let described = self
            .cognito
            .describe_user_pool()
            .user_pool_id(pool_id)
            .send()
            .await
            .classified()?;
        Ok(described
            .user_pool()
            .and_then(|p| p.domain())
            .filter(|d| !d.is_empty())
            .map(str::to_string))
    }

    async fn list_user_pool_domains(&self, pool_id: &str) -> Result<Vec<ListedResource>, AwsError> {
        Ok(self
            .user_pool_domain(pool_id)
            .await?
            .map(|domain| ListedResource::new(domain.clone(), domain))
            .into_iter()
            .collect())
    }

    async fn delete_user_pool_domain(&self, pool_id: &str, domain: &str) -> Result<(), AwsError> {
        self.cognito
            .delete_user_pool_domain()
            .user_pool_id(pool_id)
            .domain(domain)
            .send()
            .await
            .classified()?;

        wait_for_resource(
            self.wait.clone(),
            self.cancel.as_ref(),
            || async move {
                match self.user_pool_domain(pool_id).await {
                    Ok(current) => Ok(current.as_deref() != Some(domain)),
                    Err(e) if e.is_not_found() => Ok(true),
                    Err(e) => Err(e),
                }
            },
            &format!("user pool domain {domain}"),
        )
        .await?;
        Ok(())
    }

    async fn delete_user_pool(&self, pool_id: &str) -> Result<(), AwsError> {
        self.cognito
            .delete_user_pool()
            .user_pool_id(pool_id)
            .send()
            .await
            .classified()?;
        Ok(())
    }

    // ---- IAM ----

    async fn list_roles(&self) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let resp = self
                .iam
                .list_roles()
                .set_marker(marker.take())
                .send()
                .await
                .classified()?;

            for role in resp.roles() {
                let name = role.role_name().text();
                let mut entry = ListedResource::new(name.clone(), name.clone());
                if self.fetch_tags {
                    let tags = self
                        .iam
                        .list_role_tags()
                        .role_name(&name)
                        .send()
                        .await
                        .classified()?;
                    entry.tags = extract_iam_tags(tags.tags());
                }
                listed.push(entry);
            }

            if resp.is_truncated() {
                marker = resp.marker().map(|s| s.to_string());
            }
            if marker.is_none() {
                break;
            }
        }
        debug!(count = listed.len(), "Listed IAM roles");
        Ok(listed)
    }

    /// Detach and delete everything attached to a role, then the role itself
    async fn delete_role(&self, role_name: &str) -> Result<(), AwsError> {
        let attached = self
            .iam
            .list_attached_role_policies()
            .role_name(role_name)
            .max_items(ROLE_DETAIL_PAGE_SIZE)
            .send()
            .await
            .classified()?;
        for policy in attached.attached_policies() {
            let Some(arn) = policy.policy_arn() else { continue };
            self.iam
                .detach_role_policy()
                .role_name(role_name)
                .policy_arn(arn)
                .send()
                .await
                .classified()?;
            debug!(role_name = %role_name, policy_arn = %arn, "Detached managed policy");
        }

        let inline = self
            .iam
            .list_role_policies()
            .role_name(role_name)
            .max_items(ROLE_DETAIL_PAGE_SIZE)
            .send()
            .await
            .classified()?;
        for policy_name in inline.policy_names() {
            self.iam
                .delete_role_policy()
                .role_name(role_name)
                .policy_name(policy_name)
                .send()
                .await
                .classified()?;
            debug!(role_name = %role_name, policy_name = %policy_name, "Deleted inline policy");
        }

        let profiles = self
            .iam
            .list_instance_profiles_for_role()
            .role_name(role_name)
            .max_items(ROLE_DETAIL_PAGE_SIZE)
            .send()
            .await
            .classified()?;
        for profile in profiles.instance_profiles() {
            let profile_name = profile.instance_profile_name().text();
            self.iam
                .remove_role_from_instance_profile()
                .instance_profile_name(&profile_name)
                .role_name(role_name)
                .send()
                .await
                .classified()?;
            debug!(role_name = %role_name, profile_name = %profile_name, "Removed role from instance profile");
        }

        self.iam
            .delete_role()
            .role_name(role_name)
            .send()
            .await
            .classified()?;
        Ok(())
    }

    // ---- Lambda ----

    async fn list_functions(&self) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let resp = self
                .lambda
                .list_functions()
                .set_marker(marker.take())
                .send()
                .await
                .classified()?;

            for function in resp.functions() {
                let Some(name) = function.function_name() else { continue };
                let mut entry = ListedResource::new(name, name);
                if self.fetch_tags {
                    if let Some(arn) = function.function_arn() {
                        let tags = self
                            .lambda
                            .list_tags()
                            .resource(arn)
                            .send()
                            .await
                            .classified()?;
                        entry.tags = map_tags(tags.tags());
                    }
                }
                listed.push(entry);
            }

            match resp.next_marker() {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }
        debug!(count = listed.len(), "Listed Lambda functions");
        Ok(listed)
    }

    async fn delete_function(&self, name: &str) -> Result<(), AwsError> {
        self.lambda
            .delete_function()
            .function_name(name)
            .send()
            .await
            .classified()?;
        Ok(())
    }

    // ---- Secrets Manager ----

    async fn list_secrets(&self) -> Result<Vec<ListedResource>, AwsError> {
        let mut listed = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let resp = self
                .secrets
                .list_secrets()
                .set_next_token(next_token.take())
                .send()
                .await
                .classified()?;

            for secret in resp.secret_list() {
                let Some(name) = secret.name() else { continue };
                if is_service_managed_secret(name, secret.owning_service()) {
                    debug!(name, "Skipping service-managed secret");
                    continue;
                }
                let mut entry = ListedResource::new(name, name);
                entry.tags = extract_secret_tags(secret.tags());
                listed.push(entry);
            }

            match resp.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        debug!(count = listed.len(), "Listed secrets");
        Ok(listed)
    }

    /// Delete immediately, skipping the recovery window
    async fn delete_secret(&self, name: &str) -> Result<(), AwsError> {
        self.secrets
            .delete_secret()
            .secret_id(name)
            .force_delete_without_recovery(true)
            .send()
            .await
            .classified()?;
        Ok(())
    }
}

/// Name prefix of the secrets AgentCore Identity keeps for credential providers
const AGENTCORE_IDENTITY_SECRET_PREFIX: &str = "bedrock-agentcore-identity";

/// Secrets owned by a service go away with their owner and refuse direct
/// deletion, so they never enter the inventory.
fn is_service_managed_secret(name: &str, owning_service: Option<&str>) -> bool {
    owning_service.is_some_and(|service| !service.is_empty())
        || name.starts_with(AGENTCORE_IDENTITY_SECRET_PREFIX)
}

/// `(parent, child)` parts of a child resource id
fn child_parts(resource: &ResourceRef) -> Result<(&str, &str), AwsError> {
    resource.child_id_parts().ok_or_else(|| {
        AwsError::Invalid(format!(
            "{} id '{}' is not of the form parent:child",
            resource.kind, resource.id
        ))
    })
}

/// Parent key a child listing must name
fn require_parent(kind: ResourceKind, parent: Option<&ResourceKey>) -> Result<&str, AwsError> {
    match parent {
        Some(p) if Some(p.kind) == kind.parent_kind() => Ok(&p.id),
        _ => Err(AwsError::Invalid(format!(
            "{kind} can only be listed under a {} parent",
            kind.parent_kind().map(|k| k.as_str()).unwrap_or("root")
        ))),
    }
}

impl ResourceBackend for AwsBackend {
    async fn list(
        &self,
        kind: ResourceKind,
        parent: Option<&ResourceKey>,
    ) -> Result<Vec<ListedResource>, AwsError> {
        match kind {
            ResourceKind::Gateway => self.list_gateways().await,
            ResourceKind::GatewayTarget => {
                self.list_gateway_targets(require_parent(kind, parent)?).await
            }
            ResourceKind::CredentialProvider => self.list_credential_providers().await,
            ResourceKind::UserPool => self.list_user_pools().await,
            ResourceKind::UserPoolDomain => {
                self.list_user_pool_domains(require_parent(kind, parent)?).await
            }
            ResourceKind::IamRole => self.list_roles().await,
            ResourceKind::LambdaFunction => self.list_functions().await,
            ResourceKind::Secret => self.list_secrets().await,
        }
    }

    async fn delete(&self, resource: &ResourceRef) -> Result<(), AwsError> {
        match resource.kind {
            ResourceKind::Gateway => self.delete_gateway(&resource.id).await?,
            ResourceKind::GatewayTarget => {
                let (gateway_id, target_id) = child_parts(resource)?;
                self.delete_gateway_target(gateway_id, target_id).await?
            }
            ResourceKind::CredentialProvider => self.delete_credential_provider(&resource.id).await?,
            ResourceKind::UserPool => self.delete_user_pool(&resource.id).await?,
            ResourceKind::UserPoolDomain => {
                let (pool_id, domain) = child_parts(resource)?;
                self.delete_user_pool_domain(pool_id, domain).await?
            }
            ResourceKind::IamRole => self.delete_role(&resource.id).await?,
            ResourceKind::LambdaFunction => self.delete_function(&resource.id).await?,
            ResourceKind::Secret => self.delete_secret(&resource.id).await?,
        }
        info!(kind = %resource.kind, id = %resource.id, "Deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_parts_rejects_plain_id() {
        let target = ResourceRef::new(ResourceKind::GatewayTarget, "no-parent", "t");
        assert!(matches!(child_parts(&target), Err(AwsError::Invalid(_))));

        let target = ResourceRef::new(ResourceKind::GatewayTarget, "gw-1:t-1", "t");
        assert_eq!(child_parts(&target).unwrap(), ("gw-1", "t-1"));
    }

    #[test]
    fn test_require_parent_kind() {
        let gateway = ResourceKey::new(ResourceKind::Gateway, "gw-1");
        let pool = ResourceKey::new(ResourceKind::UserPool, "pool-1");

        assert_eq!(
            require_parent(ResourceKind::GatewayTarget, Some(&gateway)).unwrap(),
            "gw-1"
        );
        assert!(require_parent(ResourceKind::GatewayTarget, Some(&pool)).is_err());
        assert!(require_parent(ResourceKind::UserPoolDomain, None).is_err());
    }

    #[test]
    fn test_service_managed_secrets_are_skipped() {
        assert!(is_service_managed_secret(
            "bedrock-agentcore-identity!default/apikey/WikipediaTarget-apikey",
            None
        ));
        assert!(is_service_managed_secret(
            "agentcore/wikipedia-api-key",
            Some("bedrock-agentcore")
        ));
        assert!(!is_service_managed_secret("agentcore/wikipedia-api-key", None));
        assert!(!is_service_managed_secret("agentcore/wikipedia-api-key", Some("")));
    }
}
