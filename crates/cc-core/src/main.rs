//! cloud-census: cloud unit audit CLI.
//!
//! Counts billable resources across cloud accounts by driving each
//! provider's CLI once per resource type and scope unit, and writes one
//! CSV report per audit target. A single unreachable scope unit never
//! aborts the audit; a fatally failed target never aborts its siblings.

use clap::{Args, Parser, Subcommand};
use cc_common::{Error, ErrorCategory};
use cc_config::{
    resolve_config_file, validate_policy, AuditPolicy, ConfigError, DiscoveryFailureMode,
};
use cc_core::census::{CensusRunner, RunSummary};
use cc_core::exec::{CommandRunner, ExecConfig, DEFAULT_MAX_OUTPUT_BYTES};
use cc_core::exit_codes::ExitCode;
use cc_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use cc_core::providers::{self, ProviderPlan};
use cc_report::ReportWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// cloud-census - point-in-time resource counts for licensing audits
#[derive(Parser)]
#[command(name = "cloud-census")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Override config directory
    #[arg(long, global = true, env = "CLOUD_CENSUS_CONFIG_DIR")]
    config: Option<PathBuf>,

    /// Directory report files are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Per-command timeout in seconds (0 disables)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Attempts per external command (1 = no retry)
    #[arg(long, global = true)]
    retries: Option<u32>,

    /// Delay between retry attempts in milliseconds
    #[arg(long, global = true)]
    retry_backoff_ms: Option<u64>,

    /// Behavior when scope discovery fails for a target
    #[arg(long, global = true, value_enum)]
    on_discovery_failure: Option<DiscoveryFailureMode>,

    /// Exit non-zero when any target aborts fatally
    #[arg(long, global = true)]
    strict: bool,

    /// Log format
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = LogFormat::Human,
        env = "CLOUD_CENSUS_LOG_FORMAT"
    )]
    log_format: LogFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit AWS accounts (one report per profile)
    Aws(AwsArgs),

    /// Audit Azure subscriptions
    Azure(AzureArgs),

    /// Audit GCP projects
    Gcp(GcpArgs),

    /// Audit OCI tenancies (one report per profile)
    Oci(OciArgs),

    /// Audit Alibaba Cloud accounts
    Alibaba(AlibabaArgs),

    /// Audit DigitalOcean teams (one report per CLI context)
    Digitalocean(DigitalOceanArgs),
}

#[derive(Args, Debug)]
struct AwsArgs {
    /// AWS profiles to audit (default: the default credential chain)
    #[arg(long, num_args = 1..)]
    profiles: Vec<String>,

    /// Restrict the census to these regions
    #[arg(long, num_args = 1..)]
    regions: Vec<String>,
}

#[derive(Args, Debug)]
struct AzureArgs {
    /// Azure subscription ids to audit
    #[arg(long, num_args = 1.., required = true)]
    subscriptions: Vec<String>,
}

#[derive(Args, Debug)]
struct GcpArgs {
    /// GCP project ids to audit
    #[arg(long, num_args = 1.., required = true)]
    projects: Vec<String>,
}

#[derive(Args, Debug)]
struct OciArgs {
    /// OCI profiles to audit (default: the default profile)
    #[arg(long, num_args = 1..)]
    profiles: Vec<String>,

    /// Restrict the census to these compartment OCIDs
    #[arg(long, num_args = 1..)]
    compartments: Vec<String>,

    /// Additional arguments appended to every OCI CLI call
    #[arg(long = "cli-args", num_args = 1..)]
    cli_args: Vec<String>,
}

#[derive(Args, Debug)]
struct AlibabaArgs {
    /// Alibaba profiles to audit (default: the default profile)
    #[arg(long, num_args = 1..)]
    profiles: Vec<String>,

    /// Restrict the census to these region ids
    #[arg(long, num_args = 1..)]
    regions: Vec<String>,
}

#[derive(Args, Debug)]
struct DigitalOceanArgs {
    /// doctl contexts to audit (default: the current context)
    #[arg(long, num_args = 1..)]
    contexts: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(&LogConfig {
        format: cli.global.log_format,
        level: LogLevel::from_verbosity(cli.global.verbose, cli.global.quiet),
    });

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "audit failed");
            match err.category() {
                ErrorCategory::Config => ExitCode::ConfigError,
                ErrorCategory::Io => ExitCode::IoError,
                _ => ExitCode::InternalError,
            }
        }
    };
    std::process::exit(code.as_i32());
}

fn run(cli: Cli) -> Result<ExitCode, Error> {
    let policy = load_policy(&cli.global)?;

    let runner = Arc::new(CommandRunner::new(ExecConfig {
        timeout: policy.timeout(),
        max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        retry: policy.retry.clone(),
    }));

    let run_id = generate_run_id();
    let span = tracing::info_span!("audit", run_id = %run_id);
    let _guard = span.enter();

    let plans = build_plans(&cli.command, runner);

    let mut fatal_targets = 0u64;
    for plan in plans {
        let span =
            tracing::info_span!("target", provider = %plan.provider, report = %plan.report_name);
        let _guard = span.enter();

        match audit_target(&plan, &policy) {
            Ok(summary) => {
                info!(
                    count = summary.totals.count,
                    workload = summary.totals.rounded_workload(),
                    failed_units = summary.failed_units,
                    "results stored at {}",
                    plan.report_name
                );
            }
            Err(err) => {
                fatal_targets += 1;
                error!(error = %err, "target audit aborted");
            }
        }
    }

    if fatal_targets > 0 && cli.global.strict {
        return Ok(ExitCode::StrictFailure);
    }
    Ok(ExitCode::Clean)
}

/// Resolve the policy file, then layer CLI overrides field-by-field.
fn load_policy(global: &GlobalOpts) -> Result<AuditPolicy, Error> {
    let (path, source) = resolve_config_file(global.config.as_deref());
    let mut policy = match path {
        Some(ref path) => {
            info!(path = %path.display(), %source, "loading audit policy");
            AuditPolicy::load(path).map_err(config_error)?
        }
        None => AuditPolicy::default(),
    };

    if let Some(timeout) = global.timeout {
        policy.timeout_secs = timeout;
    }
    if let Some(retries) = global.retries {
        policy.retry.max_attempts = retries;
    }
    if let Some(backoff) = global.retry_backoff_ms {
        policy.retry.backoff_ms = backoff;
    }
    if let Some(mode) = global.on_discovery_failure {
        policy.on_discovery_failure = mode;
    }
    if let Some(ref dir) = global.output_dir {
        policy.output_dir = Some(dir.clone());
    }

    validate_policy(&policy).map_err(config_error)?;
    Ok(policy)
}

fn config_error(err: ConfigError) -> Error {
    Error::Config(err.to_string())
}

/// One plan per audit target; an empty selector means the provider's
/// single unnamed default target.
fn build_plans(command: &Commands, runner: Arc<CommandRunner>) -> Vec<ProviderPlan> {
    match command {
        Commands::Aws(args) => optional_targets(&args.profiles)
            .iter()
            .map(|profile| providers::aws::plan(profile.as_deref(), &args.regions, runner.clone()))
            .collect(),
        Commands::Azure(args) => args
            .subscriptions
            .iter()
            .map(|subscription| providers::azure::plan(Some(subscription.as_str()), runner.clone()))
            .collect(),
        Commands::Gcp(args) => args
            .projects
            .iter()
            .map(|project| providers::gcp::plan(project, runner.clone()))
            .collect(),
        Commands::Oci(args) => optional_targets(&args.profiles)
            .iter()
            .map(|profile| {
                providers::oci::plan(
                    profile.as_deref(),
                    &args.compartments,
                    &args.cli_args,
                    runner.clone(),
                )
            })
            .collect(),
        Commands::Alibaba(args) => optional_targets(&args.profiles)
            .iter()
            .map(|profile| {
                providers::alibaba::plan(profile.as_deref(), &args.regions, runner.clone())
            })
            .collect(),
        Commands::Digitalocean(args) => optional_targets(&args.contexts)
            .iter()
            .map(|context| providers::digitalocean::plan(context.as_deref(), runner.clone()))
            .collect(),
    }
}

fn optional_targets(selected: &[String]) -> Vec<Option<String>> {
    if selected.is_empty() {
        vec![None]
    } else {
        selected.iter().cloned().map(Some).collect()
    }
}

/// Run one target end to end. The report header goes to disk before
/// discovery, so even a fatal abort leaves a well-formed file behind.
fn audit_target(plan: &ProviderPlan, policy: &AuditPolicy) -> Result<RunSummary, Error> {
    if let Some(ref dir) = policy.output_dir {
        std::fs::create_dir_all(dir)?;
    }
    let path = policy
        .output_dir
        .clone()
        .unwrap_or_default()
        .join(&plan.report_name);
    let mut writer =
        ReportWriter::create(path, plan.scope_kind).map_err(|e| Error::Report(e.to_string()))?;

    CensusRunner::new(plan.resolver.as_ref(), &plan.registry)
        .on_discovery_failure(policy.on_discovery_failure)
        .run(&mut writer)
}
