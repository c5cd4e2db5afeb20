//! starkindex CLI: crawl Starknet contract events into a JSON store and
//! aggregate the result.
//!
//! Usage:
//! ```bash
//! starkindex locate
//! starkindex crawl       --output ./data [--from-block N] [--to-block N] [--event-filter NAME]...
//! starkindex standalone  --tx <hash> --event-filter CrewmateRecruitedV1
//! starkindex blocks      --output ./blocks [--from-block N] [--to-block N]
//! starkindex leaderboard --input ./data/events.json --event-filter CrewmatePurchased
//! starkindex occurrences --input ./data/events.json --by class
//! starkindex attributes  --input ./data/events.json --output attributes.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use starkindex_core::CrawlerConfig;

mod cmd_analytics;
mod cmd_chain;
mod logging;

use logging::{init_tracing, LogConfig};

#[derive(Parser)]
#[command(
    name = "starkindex",
    about = "Crawl Starknet contract events into an idempotent JSON store",
    long_about = "
StarkIndex crawls CrewmatePurchased and CrewmateRecruitedV1 events from the
Adalians contract, stores them deduplicated, and aggregates them offline.

ENVIRONMENT VARIABLES:
  STARKNET_RPC_URL                     Starknet JSON-RPC endpoint
  STARKNET_ADALIANS_CONTRACT_ADDRESS   Contract to crawl
  RUST_LOG                             Overrides --log-level
",
    version
)]
struct Cli {
    /// Crawler config file (JSON); flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Starknet JSON-RPC endpoint
    #[arg(long, global = true, env = "STARKNET_RPC_URL")]
    rpc_url: Option<String>,

    /// Contract address to crawl
    #[arg(long, global = true, env = "STARKNET_ADALIANS_CONTRACT_ADDRESS")]
    contract: Option<String>,

    /// Log level: trace | debug | info | warn | error
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the block the contract was deployed at
    Locate,

    /// Crawl events into <output>/events.json, resuming from <output>/cursor.json
    Crawl {
        /// Store directory
        #[arg(short, long)]
        output: PathBuf,
        /// Start here, ignoring any saved cursor
        #[arg(long)]
        from_block: Option<u64>,
        /// Stop once this block is drained
        #[arg(long)]
        to_block: Option<u64>,
        /// Event kinds to crawl (repeatable; default: all)
        #[arg(long = "event-filter")]
        event_filter: Vec<String>,
    },

    /// Decode the events of one transaction
    Standalone {
        /// Transaction hash
        #[arg(long)]
        tx: String,
        /// Event kind to decode
        #[arg(long = "event-filter")]
        event_filter: String,
    },

    /// Archive raw blocks as <output>/<n / blocks-per-dir>/<n>.json
    Blocks {
        /// Archive directory
        #[arg(short, long)]
        output: PathBuf,
        /// First block when the archive is empty
        #[arg(long, default_value_t = 0)]
        from_block: u64,
        /// Stop once this block is archived
        #[arg(long)]
        to_block: Option<u64>,
        /// Block files per subdirectory
        #[arg(long, default_value_t = 1000)]
        blocks_per_dir: u64,
        /// Seconds between polls once caught up
        #[arg(long, default_value_t = 10)]
        poll_secs: u64,
    },

    /// Score callers (purchases) or crewmate classes (recruitments)
    Leaderboard {
        /// Records file written by `crawl`
        #[arg(short, long)]
        input: PathBuf,
        /// Event kind to score; omit to score every record per caller
        #[arg(long = "event-filter")]
        event_filter: Option<String>,
        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count records per value of one field
    Occurrences {
        #[arg(short, long)]
        input: PathBuf,
        /// Field to group by, e.g. `class`, `caller`, `station`
        #[arg(long)]
        by: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Records with crewmate class codes replaced by class names
    Attributes {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&LogConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    match cli.command {
        Commands::Locate => {
            let config = load_config(cli.config.as_deref(), cli.contract)?;
            cmd_chain::locate(&require_rpc_url(cli.rpc_url)?, &config).await
        }

        Commands::Crawl { output, from_block, to_block, event_filter } => {
            let config = load_config(cli.config.as_deref(), cli.contract)?;
            let args = cmd_chain::CrawlArgs {
                output: &output,
                from_block,
                to_block,
                event_filter: &event_filter,
            };
            cmd_chain::crawl(&require_rpc_url(cli.rpc_url)?, config, args).await
        }

        Commands::Standalone { tx, event_filter } => {
            cmd_chain::standalone(&require_rpc_url(cli.rpc_url)?, &tx, &event_filter).await
        }

        Commands::Blocks { output, from_block, to_block, blocks_per_dir, poll_secs } => {
            let config = load_config(cli.config.as_deref(), cli.contract)?;
            let args = cmd_chain::BlocksArgs {
                output: &output,
                from_block,
                to_block,
                blocks_per_dir,
                poll_secs,
            };
            cmd_chain::blocks(&require_rpc_url(cli.rpc_url)?, &config, args).await
        }

        Commands::Leaderboard { input, event_filter, output } => {
            cmd_analytics::run_leaderboard(&input, event_filter.as_deref(), output.as_deref()).await
        }

        Commands::Occurrences { input, by, output } => {
            cmd_analytics::run_occurrences(&input, &by, output.as_deref()).await
        }

        Commands::Attributes { input, output } => {
            cmd_analytics::run_attributes(&input, output.as_deref()).await
        }
    }
}

/// Config file (or defaults) with the contract flag applied on top.
fn load_config(path: Option<&Path>, contract: Option<String>) -> Result<CrawlerConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            CrawlerConfig::from_json(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => CrawlerConfig::default(),
    };
    if let Some(contract) = contract {
        config.contract_address = contract;
    }
    Ok(config)
}

fn require_rpc_url(url: Option<String>) -> Result<String> {
    url.context("no RPC endpoint: pass --rpc-url or set STARKNET_RPC_URL")
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
