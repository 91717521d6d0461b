// crates/orion-cli/src/main.rs
// ============================================================================
// Module: Orion CLI Entry Point
// Description: Command dispatcher for running the control plane and for
//              administering it while it runs.
// Purpose: Implement spec.md §5-§6's process wiring: boot every pipeline
//          component against one Bus, drive the Approval Coordinator's
//          admin operations from stdin, and provide a standalone audit
//          reader.
// Dependencies: clap, orion-approval, orion-audit, orion-brain, orion-bus,
//               orion-commander, orion-core, orion-council, orion-guardian,
//               orion-policy, tokio, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `orion run` boots Guardian, Brain (optionally with Council), the
//! Approval Coordinator, and Commander against one in-process [`Bus`], then
//! reads admin commands from stdin until EOF or `quit` — there is no
//! separate one-shot `approve`/`deny`/`force` subcommand, because the bus
//! this workspace ships (see `orion_bus`) has no cross-process persistence:
//! a second CLI invocation could not see a first invocation's pending
//! approvals. `orion audit tail` is genuinely standalone, since the audit
//! store is plain files on disk.

mod admin;
mod audit_mirror;
mod error;
mod pipeline;

use error::CliError;

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use orion_audit::AuditKind;

/// Orion: an autonomy-graded infrastructure incident response control plane.
#[derive(Parser, Debug)]
#[command(name = "orion", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Boot the full pipeline and drive admin operations from stdin.
    Run(RunArgs),
    /// Audit store utilities.
    Audit {
        /// Selected audit subcommand.
        #[command(subcommand)]
        command: AuditCommand,
    },
}

/// Audit store subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Print recent records of one kind.
    Tail(TailArgs),
}

/// The fixed autonomy dial, mirroring [`orion_core::contracts::AutonomyLevel`].
#[derive(ValueEnum, Debug, Clone, Copy)]
#[value(rename_all = "UPPER")]
enum AutonomyArg {
    /// Observe only.
    N0,
    /// SAFE actions execute automatically; RISKY/UNKNOWN suppressed.
    N2,
    /// SAFE actions execute automatically; RISKY/UNKNOWN require approval.
    N3,
}

impl From<AutonomyArg> for orion_core::contracts::AutonomyLevel {
    fn from(value: AutonomyArg) -> Self {
        match value {
            AutonomyArg::N0 => Self::N0,
            AutonomyArg::N2 => Self::N2,
            AutonomyArg::N3 => Self::N3,
        }
    }
}

/// Configuration for the `run` command.
#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Fixed autonomy level for this run.
    #[arg(long, value_enum, default_value = "N2")]
    autonomy: AutonomyArg,
    /// Path to the policy TOML document (spec.md §4.3). Missing or invalid
    /// files fail closed to an empty policy store.
    #[arg(long, value_name = "PATH")]
    policy: Option<PathBuf>,
    /// Path to the admin identity TOML document (spec.md §4.8).
    #[arg(long, value_name = "PATH")]
    admin_identity: PathBuf,
    /// Directory the audit store writes its JSONL files into.
    #[arg(long, value_name = "DIR", default_value = "./orion-audit")]
    audit_dir: PathBuf,
    /// Attach Council validation to Brain (spec.md §4.7). Off by default so
    /// N0/N2 demos don't need a local model or network egress configured.
    #[arg(long)]
    enable_council: bool,
}

/// Arguments for `audit tail`.
#[derive(clap::Args, Debug)]
struct TailArgs {
    /// Directory the audit store was opened against.
    #[arg(long, value_name = "DIR", default_value = "./orion-audit")]
    audit_dir: PathBuf,
    /// Which record kind to read.
    #[arg(long, value_enum)]
    kind: AuditKindArg,
    /// Maximum number of records to print.
    #[arg(long)]
    limit: Option<usize>,
    /// Only print records recorded at or after this RFC3339 timestamp.
    #[arg(long)]
    since: Option<String>,
}

/// CLI-facing mirror of [`AuditKind`], since clap needs `ValueEnum`.
#[derive(ValueEnum, Debug, Clone, Copy)]
#[value(rename_all = "lower")]
enum AuditKindArg {
    Event,
    Incident,
    Decision,
    Outcome,
    Escalation,
}

impl From<AuditKindArg> for AuditKind {
    fn from(value: AuditKindArg) -> Self {
        match value {
            AuditKindArg::Event => Self::Event,
            AuditKindArg::Incident => Self::Incident,
            AuditKindArg::Decision => Self::Decision,
            AuditKindArg::Outcome => Self::Outcome,
            AuditKindArg::Escalation => Self::Escalation,
        }
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::layer::SubscriberExt as _;

    let fmt_layer = fmt::layer().json().with_current_span(true).with_span_list(true);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::Registry::default().with(filter).with(fmt_layer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => pipeline::run(args).await,
        Commands::Audit { command: AuditCommand::Tail(args) } => tail(args),
    };
    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "orion exited with an error");
            std::process::ExitCode::FAILURE
        }
    }
}

#[allow(clippy::print_stdout, reason = "audit records are newline-delimited JSON meant for stdout")]
fn tail(args: TailArgs) -> Result<(), CliError> {
    let since = args
        .since
        .map(|raw| time::OffsetDateTime::parse(&raw, &time::format_description::well_known::Rfc3339))
        .transpose()
        .map_err(|err| CliError::InvalidTimestamp(err.to_string()))?;
    let store = orion_audit::AuditStore::open(&args.audit_dir)?;
    let records = store.read(args.kind.into(), args.limit, since)?;
    for record in records {
        println!("{}", serde_json::to_string(&record.payload).map_err(CliError::Serialize)?);
    }
    Ok(())
}
