//! Configuration types for a sweep run

use crate::executor::ExecutorConfig;
use crate::report::OutputFormat;
use agentcore_sweep_common::DeploymentScope;
use agentcore_sweep_common::defaults::DEFAULT_REGION;
use std::time::Duration;

/// AWS connection settings
#[derive(Debug, Clone)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,
    /// AWS profile name (overrides default credential resolution)
    pub profile: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            profile: None,
        }
    }
}

/// Everything one scan/preview/destroy invocation needs
#[derive(Debug, Clone, Default)]
pub struct SweepConfig {
    pub aws: AwsConfig,
    pub scope: DeploymentScope,
    pub executor: ExecutorConfig,
    pub format: OutputFormat,
}

impl SweepConfig {
    pub fn region(&self) -> &str {
        &self.aws.region
    }

    pub fn profile(&self) -> Option<&str> {
        self.aws.profile.as_deref()
    }

    /// Bound on each list or delete call
    pub fn call_timeout(&self) -> Duration {
        self.executor.retry.call_timeout
    }
}
