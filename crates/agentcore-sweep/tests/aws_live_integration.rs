//! Live AWS smoke tests
//!
//! These create a throwaway Secrets Manager secret under a unique name prefix,
//! then sweep that prefix with the real backend. Nothing outside the prefix is
//! in scope.
//!
//! Run with:
//! ```
//! AWS_PROFILE=your_profile cargo test --test aws_live_integration -- --ignored
//! ```

use agentcore_sweep::aws::{AwsBackend, AwsContext, FromAwsContext, get_current_account_id};
use agentcore_sweep::orchestrator;
use agentcore_sweep::{SweepConfig, prepare};
use agentcore_sweep_common::{DeploymentScope, OutcomeStatus, ResourceKind, ScopeSelector};
use agentcore_sweep_test_utils::{get_test_region, test_scope_prefix};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn prefix_config(region: &str, prefix: &str) -> SweepConfig {
    let mut config = SweepConfig::default();
    config.aws.region = region.to_string();
    config.scope = DeploymentScope::new(ScopeSelector::Prefix(prefix.to_string()))
        .with_kinds([ResourceKind::Secret]);
    config
}

#[tokio::test]
#[ignore]
async fn test_caller_identity() {
    let ctx = AwsContext::new(&get_test_region()).await;
    let account = get_current_account_id(&ctx)
        .await
        .expect("Should resolve caller identity");
    assert_eq!(account.len(), 12);
}

#[tokio::test]
#[ignore]
async fn test_sweep_secret_by_prefix() {
    let region = get_test_region();
    let prefix = test_scope_prefix();
    let name = format!("{prefix}api-key");
    let ctx = AwsContext::new(&region).await;

    println!("Creating secret: {name}");
    ctx.secrets_client()
        .create_secret()
        .name(&name)
        .secret_string("placeholder")
        .send()
        .await
        .expect("Should create secret");

    let config = prefix_config(&region, &prefix);
    let backend = Arc::new(AwsBackend::from_context(&ctx));

    let prepared = prepare(backend.as_ref(), &config)
        .await
        .expect("Should scan and plan");
    assert_eq!(prepared.plan.len(), 1);
    assert_eq!(prepared.plan.steps()[0].id, name);

    let cancel = CancellationToken::new();
    let outcomes =
        orchestrator::execute(Arc::clone(&backend), &prepared, &config.executor, &cancel).await;
    assert_eq!(outcomes[0].status, OutcomeStatus::Deleted, "{outcomes:?}");

    // Replaying the plan is idempotent
    let replay =
        orchestrator::execute(Arc::clone(&backend), &prepared, &config.executor, &cancel).await;
    assert_eq!(replay[0].status, OutcomeStatus::AlreadyAbsent, "{replay:?}");

    let rescanned = prepare(backend.as_ref(), &config)
        .await
        .expect("Should rescan");
    assert!(rescanned.inventory.is_empty());
}
