//! agentcore-sweep: remove the AWS resources of an AgentCore gateway demo
//!
//! Reports go to stdout; logs, prompts and errors go to stderr.

use agentcore_sweep::aws::{AwsBackend, AwsContext, FromAwsContext, get_current_account_id};
use agentcore_sweep::config::{AwsConfig, SweepConfig};
use agentcore_sweep::executor::ExecutorConfig;
use agentcore_sweep::gate::{self, Authorization, Confirmation, MenuChoice, Mode};
use agentcore_sweep::orchestrator::{self, Prepared};
use agentcore_sweep::report::{self, EXIT_FAILED, EXIT_FATAL, EXIT_OK, OutputFormat, Summary};
use agentcore_sweep::retry::RetryPolicy;
use agentcore_sweep_common::defaults::{
    DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS, DEFAULT_REGION,
    DEFAULT_RUN_TIMEOUT_SECS,
};
use agentcore_sweep_common::{DeploymentScope, ResourceKind, ScopeSelector};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Log filter used when RUST_LOG is unset
const DEFAULT_LOG_FILTER: &str =
    "info,aws_config=warn,aws_smithy_runtime=warn,aws_smithy_runtime_api=warn,aws_sdk_sts=warn";

#[derive(Parser, Debug)]
#[command(name = "agentcore-sweep")]
#[command(about = "Find, preview and delete the AWS resources of an AgentCore gateway demo")]
#[command(version)]
struct Args {
    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// AWS region
    #[arg(long, global = true, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// AWS profile to use
    #[arg(long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Report format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Select resources whose name starts with this prefix instead of the demo name markers
    #[arg(long, global = true, conflicts_with = "tag", value_parser = parse_prefix)]
    prefix: Option<String>,

    /// Select resources carrying this tag instead of the demo name markers
    #[arg(long, global = true, value_name = "KEY=VALUE", value_parser = parse_tag)]
    tag: Option<(String, String)>,

    /// Comma-separated resource kinds to include (default: all)
    #[arg(long, global = true, value_delimiter = ',')]
    kinds: Vec<ResourceKind>,

    /// Deletes in flight at once
    #[arg(long, global = true, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Attempts per resource for transient failures, including the first
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Timeout in seconds for each list or delete call
    #[arg(long, global = true, default_value_t = DEFAULT_CALL_TIMEOUT_SECS)]
    call_timeout_secs: u64,

    /// Timeout in seconds for the whole deletion run
    #[arg(long, global = true, default_value_t = DEFAULT_RUN_TIMEOUT_SECS)]
    run_timeout_secs: u64,
}

fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

fn parse_prefix(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("prefix must not be empty".to_string());
    }
    Ok(s.to_string())
}

impl RunArgs {
    fn selector(&self) -> ScopeSelector {
        match (&self.prefix, &self.tag) {
            (Some(prefix), _) => ScopeSelector::Prefix(prefix.clone()),
            (None, Some((key, value))) => ScopeSelector::Tag {
                key: key.clone(),
                value: value.clone(),
            },
            (None, None) => ScopeSelector::Markers,
        }
    }
}

impl From<RunArgs> for SweepConfig {
    fn from(args: RunArgs) -> Self {
        let scope = DeploymentScope::new(args.selector()).with_kinds(args.kinds);
        Self {
            aws: AwsConfig {
                region: args.region,
                profile: args.profile,
            },
            scope,
            executor: ExecutorConfig {
                concurrency: args.concurrency,
                retry: RetryPolicy {
                    max_attempts: args.max_attempts,
                    call_timeout: Duration::from_secs(args.call_timeout_secs),
                    ..Default::default()
                },
                run_timeout: Duration::from_secs(args.run_timeout_secs),
            },
            format: args.format,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the resources in scope and what each must be deleted before
    Scan,

    /// Show the deletion plan without deleting anything
    Preview,

    /// Delete every resource in scope, in dependency order
    Destroy {
        /// Skip the typed confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Interactive menu: preview, destroy or quit
    Menu,
}

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(code) => code,
        Err(e) => {
            print_error(&e, None);
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error, hint: Option<&str>) {
    use std::io::Write;

    let mut stderr = std::io::stderr();
    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(hint) = hint {
        let _ = writeln!(stderr, "\n\x1b[2mHint:\x1b[0m {hint}");
    }
}

async fn run() -> Result<i32> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config: SweepConfig = args.run.into();
    let mut stdin = BufReader::new(tokio::io::stdin());

    let (mode, yes) = match args.command {
        Command::Scan => return scan(&config).await,
        Command::Preview => (Mode::Preview, false),
        Command::Destroy { yes } => (Mode::Destroy, yes),
        Command::Menu => match menu(&mut stdin).await? {
            Some(mode) => (mode, false),
            None => return Ok(EXIT_OK),
        },
    };

    let cancel = CancellationToken::new();

    let Some((ctx, backend, prepared)) = preflight(&config, cancel.clone()).await? else {
        return Ok(EXIT_FATAL);
    };

    if mode == Mode::Preview {
        println!("{}", report::render_preview(&prepared.plan, config.format)?.trim_end());
        return Ok(EXIT_OK);
    }

    if !prepared.plan.is_empty() {
        let confirmation = if yes {
            None
        } else {
            eprintln!("{}", report::render_preview(&prepared.plan, OutputFormat::Text)?.trim_end());
            eprint!("{}", gate::confirmation_prompt(prepared.plan.len()));
            Some(read_line(&mut stdin).await?.unwrap_or_default())
        };
        let confirmation = match &confirmation {
            Some(line) => Confirmation::Typed(line),
            None => Confirmation::Skipped,
        };
        if gate::authorize(mode, confirmation) == Authorization::Cancelled {
            eprintln!("Confirmation did not match; nothing was deleted.");
            return Ok(EXIT_OK);
        }
    }

    // Installed only now so Ctrl-C still aborts the prompt
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if watch_interrupts(tokio::signal::ctrl_c, &cancel).await {
                warn!("Second interrupt received, exiting without waiting");
                std::process::exit(EXIT_FAILED);
            }
        });
    }

    info!(region = %ctx.region(), scope = %config.scope, "Destroying resources");
    let outcomes =
        orchestrator::execute(Arc::new(backend), &prepared, &config.executor, &cancel).await;
    println!(
        "{}",
        report::render_outcomes(prepared.plan.scope(), &outcomes, config.format)?.trim_end()
    );
    Ok(Summary::from_outcomes(&outcomes).exit_code())
}

/// Cancel the run on the first interrupt.
///
/// Resolves to `true` when a second interrupt arrives, `false` if the
/// listener could not be installed.
async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: &CancellationToken) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if interrupt().await.is_err() {
        return false;
    }
    warn!("Interrupt received, finishing in-flight deletes (interrupt again to exit now)");
    cancel.cancel();
    interrupt().await.is_ok()
}

/// Credential check, AWS backend construction, scan and plan.
///
/// Returns `None` after printing the failure when the run must stop.
async fn preflight(
    config: &SweepConfig,
    cancel: CancellationToken,
) -> Result<Option<(AwsContext, AwsBackend, Prepared)>> {
    let ctx = AwsContext::with_profile(config.region(), config.profile()).await;

    if let Err(e) = get_current_account_id(&ctx).await {
        let hint = e.suggestion();
        print_error(&anyhow::Error::new(e), Some(hint));
        return Ok(None);
    }

    let backend = AwsBackend::from_context(&ctx)
        .with_tags(config.scope.needs_tags())
        .with_cancel(cancel);

    match orchestrator::prepare(&backend, config).await {
        Ok(prepared) => Ok(Some((ctx, backend, prepared))),
        Err(e) => {
            let hint = e.suggestion();
            print_error(&anyhow::Error::new(e), hint);
            Ok(None)
        }
    }
}

async fn scan(config: &SweepConfig) -> Result<i32> {
    let Some((_, _, prepared)) = preflight(config, CancellationToken::new()).await? else {
        return Ok(EXIT_FATAL);
    };
    println!(
        "{}",
        report::render_inventory(&prepared.inventory, &prepared.graph, config.format)?.trim_end()
    );
    Ok(EXIT_OK)
}

/// Ask for a menu choice until a valid one is given; `None` means quit
async fn menu(stdin: &mut BufReader<Stdin>) -> Result<Option<Mode>> {
    loop {
        eprint!("{}", MenuChoice::PROMPT);
        let Some(line) = read_line(stdin).await? else {
            return Ok(None);
        };
        match MenuChoice::parse(&line) {
            Some(choice) => return Ok(choice.mode()),
            None => eprintln!("Invalid choice: {}", line.trim()),
        }
    }
}

/// One line from stdin, terminator included; `None` at end of input
async fn read_line(stdin: &mut BufReader<Stdin>) -> Result<Option<String>> {
    let mut line = String::new();
    let read = stdin
        .read_line(&mut line)
        .await
        .context("failed to read from stdin")?;
    Ok((read > 0).then_some(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("agentcore-sweep").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--region", "us-west-2", "preview"]);
        assert!(matches!(args.command, Command::Preview));
        let config: SweepConfig = args.run.into();
        assert_eq!(config.scope, DeploymentScope::default());
        assert_eq!(config.executor.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.executor.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn test_scope_flags_after_subcommand() {
        let args = parse(&["destroy", "--yes", "--tag", "demo=cortex", "--kinds", "secret,iam-role"]);
        assert!(matches!(args.command, Command::Destroy { yes: true }));
        let config: SweepConfig = args.run.into();
        assert_eq!(
            config.scope.selector,
            ScopeSelector::Tag {
                key: "demo".into(),
                value: "cortex".into()
            }
        );
        assert_eq!(config.scope.kinds.len(), 2);
        assert!(config.scope.includes(ResourceKind::IamRole));
    }

    #[test]
    fn test_prefix_conflicts_with_tag() {
        let result = Args::try_parse_from([
            "agentcore-sweep",
            "preview",
            "--prefix",
            "demo-",
            "--tag",
            "k=v",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Args::try_parse_from(["agentcore-sweep", "scan", "--kinds", "bucket"]).is_err());
        assert!(Args::try_parse_from(["agentcore-sweep", "scan", "--tag", "novalue"]).is_err());
        assert!(Args::try_parse_from(["agentcore-sweep", "scan", "--max-attempts", "0"]).is_err());
    }

    #[test]
    fn test_rejects_blank_prefix() {
        for prefix in ["", "  "] {
            let err = Args::try_parse_from([
                "agentcore-sweep",
                "destroy",
                "--yes",
                "--prefix",
                prefix,
            ])
            .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{prefix:?}");
        }

        let args = parse(&["preview", "--prefix", "demo-42-"]);
        let config: SweepConfig = args.run.into();
        assert_eq!(config.scope.selector, ScopeSelector::Prefix("demo-42-".into()));
    }

    #[test]
    fn test_timeouts_and_format() {
        let args = parse(&[
            "--format",
            "json",
            "--call-timeout-secs",
            "5",
            "--run-timeout-secs",
            "60",
            "scan",
        ]);
        let config: SweepConfig = args.run.into();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.call_timeout(), Duration::from_secs(5));
        assert_eq!(config.executor.run_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_first_interrupt_cancels_second_exits() {
        let cancel = CancellationToken::new();
        let mut seen = 0;
        let forced = watch_interrupts(
            || {
                seen += 1;
                std::future::ready(Ok(()))
            },
            &cancel,
        )
        .await;

        assert!(forced);
        assert!(cancel.is_cancelled());
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn test_interrupt_listener_failure_leaves_run_alone() {
        let cancel = CancellationToken::new();
        let forced = watch_interrupts(
            || std::future::ready(Err(std::io::Error::other("no signal handler"))),
            &cancel,
        )
        .await;

        assert!(!forced);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_single_interrupt_only_cancels() {
        let cancel = CancellationToken::new();
        let mut first = true;
        let watcher = watch_interrupts(
            move || {
                let fire = std::mem::take(&mut first);
                async move {
                    if !fire {
                        std::future::pending::<()>().await;
                    }
                    Ok::<(), std::io::Error>(())
                }
            },
            &cancel,
        );
        tokio::pin!(watcher);

        let finished = tokio::time::timeout(Duration::from_millis(50), &mut watcher).await;
        assert!(finished.is_err());
        assert!(cancel.is_cancelled());
    }
}
