//! # Govsync CLI
//!
//! Command-line front end for the proposal sync engine.
//!
//! ## Commands
//!
//! - `proposal <index>`: fetch one proposal directly from the ledger
//! - `list --from <newest> --to <oldest>`: assemble a listing
//!   - `--status`: all|active|scheduled|executed|completed|canceled
//!   - `--kind`: all|on-chain|off-chain
//!   - `--start-date` / `--end-date`: YYYY-MM-DD bounds on start date
//!   - `--only-new`: fetch only indices the cache has never seen
//! - `params`: print protocol governance parameters
//!
//! ## Configuration
//!
//! `--config` points at a TOML file; every field can be overridden via
//! `GOVSYNC_*` environment variables (see `govsync_common::config`).
//! Without a cache endpoint configured the engine runs against an
//! in-process cache, which is empty on every invocation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use govsync_common::{config, CacheStore, Config, GatewayResolver, MemoryCache, RestCache};
use govsync_proposals::{
    GetAllParams, LedgerReader, ProposalRecord, ProposalStatus, RpcLedger, StatusFilter,
    SyncEngine, TypeFilter,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "govsync", about = "Governance proposal sync engine CLI")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print raw JSON instead of a summary.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and print one proposal.
    Proposal { index: u64 },
    /// List proposals in an index range, newest first.
    List {
        /// Newest index of the range (inclusive).
        #[arg(long)]
        from: u64,
        /// Oldest index of the range (inclusive).
        #[arg(long, default_value_t = 0)]
        to: u64,
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long, default_value = "all")]
        kind: String,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        end_date: Option<String>,
        #[arg(long)]
        only_new: bool,
    },
    /// Print governance parameters.
    Params,
}

fn parse_status(raw: &str) -> Result<StatusFilter> {
    Ok(match raw.to_lowercase().as_str() {
        "all" => StatusFilter::All,
        "active" => StatusFilter::Only(ProposalStatus::Active),
        "scheduled" => StatusFilter::Only(ProposalStatus::Scheduled),
        "executed" => StatusFilter::Only(ProposalStatus::Executed),
        "completed" => StatusFilter::Only(ProposalStatus::Completed),
        "canceled" => StatusFilter::Only(ProposalStatus::Canceled),
        other => bail!("unknown status filter '{}'", other),
    })
}

fn parse_kind(raw: &str) -> Result<TypeFilter> {
    Ok(match raw.to_lowercase().as_str() {
        "all" => TypeFilter::All,
        "on-chain" => TypeFilter::OnChain,
        "off-chain" => TypeFilter::OffChain,
        other => bail!("unknown kind filter '{}'", other),
    })
}

fn print_record(rec: &ProposalRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rec)?);
        return Ok(());
    }
    println!(
        "#{} [{}] {}",
        rec.index,
        rec.status.label(),
        rec.title
    );
    println!("  proposer:  {}", rec.proposer);
    println!(
        "  votes:     {} for / {} against (quorum {})",
        rec.votes_for, rec.votes_against, rec.quorum_snapshot
    );
    println!("  window:    {} .. {}", rec.start_timestamp, rec.end_timestamp);
    println!("  event:     {}", rec.event_date);
    if !rec.execution_tx_hash.is_empty() {
        println!("  executed:  {}", rec.execution_tx_hash);
    }
    Ok(())
}

async fn run<S: CacheStore>(cli: Cli, cfg: &Config, cache: S) -> Result<()> {
    let rpc_url = cfg
        .rpc_url
        .clone()
        .context("rpc_url is not configured")?;
    let contract = cfg
        .contract_address
        .clone()
        .context("contract_address is not configured")?;
    let gateway = cfg
        .gateway_url
        .clone()
        .context("gateway_url is not configured")?;

    let ledger = RpcLedger::new(rpc_url, contract, cfg.timeout_ms);
    let content = GatewayResolver::new(gateway);
    let engine = SyncEngine::new(ledger, content, cache);

    match cli.command {
        Command::Proposal { index } => {
            let rec = engine.refresh_proposal(index).await?;
            print_record(&rec, cli.json)?;
        }
        Command::List {
            from,
            to,
            status,
            kind,
            start_date,
            end_date,
            only_new,
        } => {
            let params = GetAllParams {
                start_index: from,
                end_index: to,
                status_filter: parse_status(&status)?,
                type_filter: parse_kind(&kind)?,
                start_date,
                end_date,
                fetch_only_new: only_new,
            };
            let records = engine.get_all_proposals(&params).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for rec in &records {
                    print_record(rec, false)?;
                }
                println!("{} proposal(s)", records.len());
            }
        }
        Command::Params => {
            let params = engine.ledger().governance_params().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&params)?);
            } else {
                println!("quorum:        {}", params.quorum);
                println!("voting period: {}s", params.voting_period_secs);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => config::load_from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load {}: {}", path.display(), e))?,
        None => Config::default(),
    }
    .with_env_overrides()
    .map_err(|e| anyhow::anyhow!("bad environment override: {}", e))?;

    match (&cfg.cache_url, &cfg.cache_token) {
        (Some(url), token) => {
            let cache = RestCache::new(url.clone(), token.clone());
            run(cli, &cfg, cache).await
        }
        (None, _) => run(cli, &cfg, MemoryCache::new()).await,
    }
}
