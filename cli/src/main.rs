//! `milestone` - coordinator for milestone-based token releases.
//!
//! ```text
//! init                    probe Kupo, Ogmios and the node socket
//! register-milestone      validate a schedule and print its datum
//! commit-milestone        merge oracle signatures into the local ledger
//! check-status            per-milestone quorum, vesting and claimability
//! calculate-distribution  claimed / claimable / locked for one beneficiary
//! submit-transaction      pass a signed transaction to Ogmios
//! ```
//!
//! Results go to stdout (JSON by default); logs go to stderr and are
//! controlled by `RUST_LOG`.

mod commands;
mod output;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use milestone_config::Network;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "milestone",
    version,
    about = "Oracle quorum and contract state for milestone-based token releases"
)]
struct Cli {
    /// Config file (default: ~/.milestone/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Output format
    #[arg(long, short, global = true, value_enum, default_value_t = OutputFormat::Json)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

/// Command-line overrides applied on top of the config file and environment.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Network name (testnet/mainnet/preview/preprod)
    #[arg(long, short, global = true)]
    pub network: Option<Network>,

    /// Ogmios URL
    #[arg(long, global = true)]
    pub ogmios_url: Option<String>,

    /// Kupo URL
    #[arg(long, global = true)]
    pub kupo_url: Option<String>,

    /// Path to the cardano-node socket
    #[arg(long, global = true)]
    pub cardano_node_socket: Option<PathBuf>,

    /// Base directory for the ledger and cache
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Verify connectivity to Kupo, Ogmios and the cardano-node socket
    Init,
    /// Validate a milestone schedule and generate its datum
    RegisterMilestone(commands::RegisterArgs),
    /// Commit oracle signatures for a milestone
    CommitMilestone(commands::CommitArgs),
    /// Report quorum and claimability per milestone
    CheckStatus(commands::StatusArgs),
    /// Break down a beneficiary's claimed, claimable and locked tokens
    CalculateDistribution(commands::DistributionArgs),
    /// Submit a signed transaction through Ogmios
    SubmitTransaction(commands::SubmitArgs),
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout carries command output, so logs always go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let format = cli.output;

    let ctx = match commands::Context::new(cli.config.as_deref(), cli.overrides, format) {
        Ok(ctx) => ctx,
        Err(err) => {
            output::print_error(format, &err);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Init => commands::init(&ctx).await,
        Command::RegisterMilestone(args) => commands::register_milestone(&ctx, &args),
        Command::CommitMilestone(args) => commands::commit_milestone(&ctx, &args),
        Command::CheckStatus(args) => commands::check_status(&ctx, &args).await,
        Command::CalculateDistribution(args) => commands::calculate_distribution(&ctx, &args).await,
        Command::SubmitTransaction(args) => commands::submit_transaction(&ctx, &args).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            output::print_error(format, &err);
            ExitCode::FAILURE
        }
    }
}
