//! agentcore-sweep - cleanup orchestrator for AgentCore gateway demo deployments
//!
//! Discovers the AWS resources one demo deployment left behind, orders their
//! deletion so nothing is removed while something still depends on it, and
//! either previews or executes that plan. Re-running after a partial failure
//! converges towards an empty inventory.
//!
//! Pipeline: [`scanner`] → [`graph`] → [`planner`] → [`report`] (preview) or
//! [`executor`] → [`report`] (destroy). [`orchestrator`] wires the stages and
//! [`gate`] holds the destroy confirmation logic.

pub mod aws;
pub mod config;
pub mod executor;
pub mod gate;
pub mod graph;
pub mod orchestrator;
pub mod planner;
pub mod report;
pub mod retry;
pub mod scanner;
pub mod wait;

pub use config::{AwsConfig, SweepConfig};
pub use executor::{Executor, ExecutorConfig};
pub use graph::{DependencyGraph, GraphError, build_graph};
pub use orchestrator::{Prepared, PreflightError, prepare};
pub use planner::{CycleError, DeletionPlan, plan};
pub use report::{OutputFormat, Summary};
pub use retry::RetryPolicy;
pub use scanner::{InventoryScanner, ScanError};
