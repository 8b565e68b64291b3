//! Subcommand implementations.
//!
//! Each command returns the exit code for a completed run; `Err` is rendered by
//! `main` and always exits with status 1.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use milestone_chain::{KupoClient, OgmiosClient, ValidatorLoader, contract_address};
use milestone_config::{MilestoneConfig, ResolvedConfig, check_node_socket};
use milestone_core::{
    CoreError, Ledger, RefreshPolicy, ResolvedState, StateCache, StateResolver, StatusAggregator,
    encode_datum, validate_schedule,
};
use milestone_types::{
    BeneficiaryAllocation, DistributionDatum, DistributionReport, MilestoneSchedule,
    SignatureSubmission, StatusReport,
};

use crate::Overrides;
use crate::output::{OutputFormat, check_mark, format_timestamp, print_json};

pub struct Context {
    pub config: ResolvedConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config_path: Option<&Path>, overrides: Overrides, format: OutputFormat) -> Result<Self> {
        let mut config = MilestoneConfig::load(config_path)?.resolve()?;
        if let Some(network) = overrides.network {
            config.network = network;
        }
        if let Some(url) = overrides.ogmios_url {
            config.ogmios_url = url;
        }
        if let Some(url) = overrides.kupo_url {
            config.kupo_url = url;
        }
        if let Some(socket) = overrides.cardano_node_socket {
            config.cardano_node_socket = Some(socket);
        }
        if let Some(dir) = overrides.data_dir {
            config.data_directory = dir;
        }
        Ok(Self { config, format })
    }

    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn ledger(&self) -> Result<Ledger> {
        Ok(Ledger::open(self.config.milestones_dir())?)
    }

    fn cache(&self) -> Result<StateCache> {
        Ok(StateCache::open(self.config.cache_dir())?)
    }

    fn kupo(&self) -> Result<KupoClient> {
        Ok(KupoClient::new(&self.config.kupo_url, self.config.request_timeout)?)
    }

    fn ogmios(&self) -> Result<OgmiosClient> {
        Ok(OgmiosClient::new(&self.config.ogmios_url, self.config.request_timeout)?)
    }
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Token policy ID (hex)
    #[arg(long)]
    pub token_policy_id: String,

    /// JSON file with the beneficiary allocations array
    #[arg(long, value_name = "FILE")]
    pub beneficiary_allocations: PathBuf,

    /// Comma-separated oracle addresses
    #[arg(long, value_delimiter = ',', required = true)]
    pub oracle_addresses: Vec<String>,

    /// Minimum distinct oracle signatures required
    #[arg(long, allow_negative_numbers = true)]
    pub quorum_threshold: i64,

    /// JSON file with a metadata object to embed in the datum
    #[arg(long, value_name = "FILE")]
    pub metadata: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    #[arg(long)]
    pub milestone_identifier: String,

    /// JSON file with one signature object or an array of them
    #[arg(long, value_name = "FILE")]
    pub oracle_signatures: PathBuf,

    /// Required when the milestone has no record yet
    #[arg(long)]
    pub quorum_threshold: Option<u64>,

    /// Required when the milestone has no record yet
    #[arg(long)]
    pub total_oracles: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Ignore the cache and fetch from the chain
    #[arg(long)]
    pub force_refresh: bool,

    /// Maximum cache age in seconds (default from config)
    #[arg(long, value_name = "SECS")]
    pub max_age: Option<u64>,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[arg(long)]
    pub contract_address: String,

    /// Only report this milestone
    #[arg(long)]
    pub milestone_identifier: Option<String>,

    #[command(flatten)]
    pub refresh: RefreshArgs,
}

#[derive(Args, Debug)]
pub struct DistributionArgs {
    #[arg(long)]
    pub contract_address: String,

    #[arg(long)]
    pub beneficiary_address: String,

    /// Only consider this milestone
    #[arg(long)]
    pub milestone_identifier: Option<String>,

    #[command(flatten)]
    pub refresh: RefreshArgs,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct SubmitArgs {
    /// Signed transaction as CBOR hex
    #[arg(long)]
    pub cbor: Option<String>,

    /// File containing the signed transaction as CBOR hex
    #[arg(long, value_name = "FILE")]
    pub cbor_file: Option<PathBuf>,
}

#[derive(Serialize)]
struct ServiceStatus {
    status: &'static str,
    network: String,
    services: Services,
}

#[derive(Serialize)]
struct Services {
    ogmios: milestone_chain::OgmiosHealth,
    kupo: milestone_chain::KupoHealth,
    cardano_node: NodeStatus,
}

#[derive(Serialize)]
struct NodeStatus {
    connected: bool,
    network: Option<String>,
    protocol_magic: u32,
}

pub async fn init(ctx: &Context) -> Result<ExitCode> {
    let kupo = ctx.kupo()?;
    let ogmios = ctx.ogmios()?;
    let (ogmios_health, kupo_health) = tokio::join!(ogmios.health(), kupo.health());

    let node_connected = ctx
        .config
        .cardano_node_socket
        .as_deref()
        .is_some_and(check_node_socket);
    let all_up = ogmios_health.connected && kupo_health.connected && node_connected;
    let report = ServiceStatus {
        status: if all_up { "success" } else { "partial" },
        network: ctx.config.network.to_string(),
        services: Services {
            ogmios: ogmios_health,
            kupo: kupo_health,
            cardano_node: NodeStatus {
                connected: node_connected,
                network: node_connected.then(|| ctx.config.network.to_string()),
                protocol_magic: ctx.config.protocol_magic,
            },
        },
    };

    if ctx.json() {
        print_json(&report)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("Initializing environment for {}...", report.network);
    println!();
    println!("Service Status:");
    println!("  Ogmios: {} {}", check_mark(report.services.ogmios.connected), connected_label(report.services.ogmios.connected));
    println!("  Kupo: {} {}", check_mark(report.services.kupo.connected), connected_label(report.services.kupo.connected));
    println!(
        "  Cardano Node: {} {} (protocol magic {})",
        check_mark(node_connected),
        connected_label(node_connected),
        report.services.cardano_node.protocol_magic
    );

    if all_up {
        return Ok(ExitCode::SUCCESS);
    }
    println!();
    println!("Warning: Some services are unavailable.");
    println!("  Ogmios: {}", ctx.config.ogmios_url);
    println!("  Kupo: {}", ctx.config.kupo_url);
    match &ctx.config.cardano_node_socket {
        Some(socket) => println!("  Cardano Node: {}", socket.display()),
        None => println!("  Cardano Node: no socket configured"),
    }
    Ok(ExitCode::FAILURE)
}

fn connected_label(connected: bool) -> &'static str {
    if connected { "Connected" } else { "Not connected" }
}

#[derive(Serialize)]
struct Registration {
    datum: DistributionDatum,
    contract_address: Option<String>,
    total_token_amount: i64,
}

pub fn register_milestone(ctx: &Context, args: &RegisterArgs) -> Result<ExitCode> {
    let allocations: Vec<BeneficiaryAllocation> = read_json(&args.beneficiary_allocations)
        .context("Invalid allocations file")?;
    let contract_metadata = match &args.metadata {
        Some(path) => match read_json::<Value>(path)? {
            Value::Object(map) => Some(map),
            _ => bail!("Metadata file {} must contain a JSON object", path.display()),
        },
        None => None,
    };

    let schedule = MilestoneSchedule {
        token_policy_id: args.token_policy_id.clone(),
        beneficiary_allocations: allocations,
        oracle_addresses: args
            .oracle_addresses
            .iter()
            .map(|addr| addr.trim().to_string())
            .collect(),
        quorum_threshold: args.quorum_threshold,
        contract_metadata,
    };

    let errors = validate_schedule(&schedule);
    if !errors.is_empty() {
        return Err(CoreError::ValidationFailed { errors }.into());
    }

    let datum = encode_datum(&schedule);
    let loader = ValidatorLoader::new(&ctx.config.plutus_path);
    let contract_address = match loader.validator_hash(ctx.config.validator_name.as_deref()) {
        Ok(hash) => Some(contract_address(&hash, ctx.config.network.is_mainnet())),
        Err(e) => {
            warn!("Could not calculate contract address: {e}");
            if !ctx.json() {
                eprintln!("Warning: Could not calculate contract address: {e}");
            }
            None
        }
    };

    let registration = Registration {
        datum,
        contract_address,
        total_token_amount: schedule.total_token_amount(),
    };

    if ctx.json() {
        print_json(&registration)?;
    } else {
        let datum_len = serde_json::to_string(&registration.datum)?.len();
        println!("Milestone schedule registered successfully!");
        println!(
            "Contract address: {}",
            registration.contract_address.as_deref().unwrap_or("N/A")
        );
        println!("Total token amount: {}", registration.total_token_amount);
        println!("Datum generated: {datum_len} bytes");
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct CommitSummary {
    milestone_identifier: String,
    signature_count: u64,
    quorum_threshold: u64,
    quorum_status: String,
    quorum_met: bool,
    verification_timestamp: Option<i64>,
    total_signatures: usize,
}

pub fn commit_milestone(ctx: &Context, args: &CommitArgs) -> Result<ExitCode> {
    let raw: Value = read_json(&args.oracle_signatures).context("Invalid signatures file")?;
    let signatures = signature_batch(raw)?;
    if signatures.is_empty() {
        bail!("No valid signatures provided");
    }

    let ledger = ctx.ledger()?;
    let record = ledger.commit(
        &args.milestone_identifier,
        &signatures,
        args.quorum_threshold,
        args.total_oracles,
    )?;

    let summary = CommitSummary {
        milestone_identifier: record.milestone_identifier().to_string(),
        signature_count: record.signature_count(),
        quorum_threshold: record.quorum_threshold(),
        quorum_status: record.quorum_status().to_string(),
        quorum_met: record.quorum_met(),
        verification_timestamp: record.verification_timestamp(),
        total_signatures: record.oracle_signatures().len(),
    };

    if ctx.json() {
        print_json(&summary)?;
    } else {
        println!("Milestone completion data committed successfully!");
        println!("Milestone: {}", summary.milestone_identifier);
        println!(
            "Signatures: {}/{}",
            summary.signature_count, summary.quorum_threshold
        );
        println!("Quorum status: {}", summary.quorum_status);
        if summary.quorum_met {
            println!("{} Quorum met - milestone verified!", check_mark(true));
        } else {
            println!(
                "Quorum not met - {} more signatures needed",
                summary.quorum_threshold.saturating_sub(summary.signature_count)
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Accept a single signature object or an array of them.
fn signature_batch(raw: Value) -> Result<Vec<SignatureSubmission>> {
    let items = match raw {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => bail!("Invalid signature format: expected an object or an array of objects"),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                bail!("Invalid signature format at index {i}: expected an object");
            }
            serde_json::from_value(item)
                .with_context(|| format!("Invalid signature format at index {i}"))
        })
        .collect()
}

#[derive(Serialize)]
struct CacheInfo {
    used_cache: bool,
    cached_at: i64,
}

impl From<&ResolvedState> for CacheInfo {
    fn from(resolved: &ResolvedState) -> Self {
        Self {
            used_cache: resolved.used_cache,
            cached_at: resolved.cached_at,
        }
    }
}

#[derive(Serialize)]
struct StatusOutput {
    #[serde(flatten)]
    report: StatusReport,
    cache_info: CacheInfo,
}

async fn resolve_state(ctx: &Context, address: &str, refresh: &RefreshArgs) -> Result<ResolvedState> {
    let kupo = ctx.kupo()?;
    let cache = ctx.cache()?;
    let policy = RefreshPolicy {
        force: refresh.force_refresh,
        max_age: refresh
            .max_age
            .map_or(ctx.config.cache_max_age, Duration::from_secs),
    };
    Ok(StateResolver::new(&kupo, &cache).resolve(address, policy).await?)
}

pub async fn check_status(ctx: &Context, args: &StatusArgs) -> Result<ExitCode> {
    let resolved = resolve_state(ctx, &args.contract_address, &args.refresh).await?;
    let ledger = ctx.ledger()?;
    let report = StatusAggregator::new(&ledger)
        .aggregate(&resolved.state, args.milestone_identifier.as_deref())?;

    let output = StatusOutput {
        report,
        cache_info: CacheInfo::from(&resolved),
    };

    if ctx.json() {
        print_json(&output)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("Contract: {}", output.report.contract_address);
    println!(
        "State: {} (as of {})",
        if resolved.used_cache { "cached" } else { "fresh" },
        format_timestamp(resolved.cached_at)
    );
    for (id, status) in &output.report.milestones {
        println!();
        println!("Milestone {id}");
        println!(
            "  Quorum: {} ({}/{})",
            status.quorum_status.as_str(),
            status.signature_count,
            status.quorum_threshold
        );
        if let Some(ts) = status.verification_timestamp {
            println!("  Verified at: {}", format_timestamp(ts));
        }
        println!(
            "  Tokens: {} total, {} claimed, {} unclaimed across {} allocation(s)",
            status.total_amount, status.claimed_amount, status.unclaimed_amount, status.allocation_count
        );
        println!(
            "  Vesting: {} (earliest {})",
            if status.vesting_passed { "passed" } else { "pending" },
            format_timestamp(status.earliest_vesting)
        );
        println!("  Claimable: {}", check_mark(status.claimable));
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct DistributionOutput {
    #[serde(flatten)]
    report: DistributionReport,
    cache_info: CacheInfo,
}

pub async fn calculate_distribution(ctx: &Context, args: &DistributionArgs) -> Result<ExitCode> {
    let resolved = resolve_state(ctx, &args.contract_address, &args.refresh).await?;
    let ledger = ctx.ledger()?;
    let report = milestone_core::calculate_distribution(
        &resolved.state,
        &ledger,
        &args.beneficiary_address,
        args.milestone_identifier.as_deref(),
    )?;

    let output = DistributionOutput {
        report,
        cache_info: CacheInfo::from(&resolved),
    };

    if ctx.json() {
        print_json(&output)?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = &output.report;
    println!("Beneficiary: {}", report.beneficiary_address);
    println!("Contract: {}", report.contract_address);
    for alloc in &report.allocations {
        println!(
            "  [{}] {} {} tokens, vests {}: {}",
            alloc.index,
            alloc.milestone_identifier,
            alloc.token_amount,
            format_timestamp(alloc.vesting_timestamp),
            if alloc.claimed {
                "claimed"
            } else if alloc.claimable {
                "claimable"
            } else {
                "locked"
            }
        );
    }
    println!("Total: {}", report.total_amount);
    println!("Claimed: {}", report.claimed_amount);
    println!("Claimable: {}", report.claimable_amount);
    println!("Locked: {}", report.locked_amount);
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct Submission {
    transaction_id: String,
}

pub async fn submit_transaction(ctx: &Context, args: &SubmitArgs) -> Result<ExitCode> {
    let cbor = match (&args.cbor, &args.cbor_file) {
        (Some(cbor), _) => cbor.trim().to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .trim()
            .to_string(),
        (None, None) => bail!("Either --cbor or --cbor-file is required"),
    };
    if cbor.is_empty() || cbor.len() % 2 != 0 || !cbor.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("Transaction must be non-empty, even-length hex");
    }

    let transaction_id = ctx.ogmios()?.submit(&cbor).await?;
    let submission = Submission { transaction_id };

    if ctx.json() {
        print_json(&submission)?;
    } else {
        println!("Transaction submitted: {}", submission.transaction_id);
    }
    Ok(ExitCode::SUCCESS)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("File not found or unreadable: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
