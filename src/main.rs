//! Screen a saved option-chain document from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Put credit spreads at least 5% out of the money, $100 minimum credit
//! spread-finder spreads --chain spx_chain.json --expiration 2025-01-17 --type put \
//!     --dist-from-strike 0.05 --min-credit 100
//!
//! # Iron condors as JSON
//! spread-finder --format json iron-condor --chain spx_chain.json --expiration 2025-01-17
//!
//! # Contracts between 0.10 and 0.20 delta
//! spread-finder filter --chain spx_chain.json --min-delta 0.10 --max-delta 0.20
//!
//! # Raw tool call, as a tool-calling server would dispatch it
//! spread-finder tool --chain spx_chain.json --name find_spreads \
//!     --args '{"expiration_date": "2025-01-17", "option_type": "call"}'
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use spread_finder::tools::{FilterOptionsArgs, FindSpreadsArgs, IronCondorArgs, SpreadFilterArgs};
use spread_finder::{handle_tool, tool_definitions, OptionChain, OutputFormat, Settings};

#[derive(Parser)]
#[command(name = "spread-finder")]
#[command(about = "Screen option chains for vertical spreads and iron condors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (markdown or json); overrides SPREAD_FINDER_OUTPUT
    #[arg(long, global = true)]
    format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Find vertical credit spreads on one side of the chain
    Spreads {
        /// Path to the option-chain JSON document
        #[arg(short, long)]
        chain: PathBuf,

        /// Expiration date (YYYY-MM-DD)
        #[arg(short, long)]
        expiration: String,

        /// Option type (call or put)
        #[arg(short = 't', long = "type")]
        option_type: String,

        #[command(flatten)]
        filters: FilterOpts,
    },

    /// Find iron condors combining call and put credit spreads
    IronCondor {
        /// Path to the option-chain JSON document
        #[arg(short, long)]
        chain: PathBuf,

        /// Expiration date (YYYY-MM-DD)
        #[arg(short, long)]
        expiration: String,

        #[command(flatten)]
        filters: FilterOpts,
    },

    /// List contracts within a delta band and strike range
    Filter {
        /// Path to the option-chain JSON document
        #[arg(short, long)]
        chain: PathBuf,

        /// Restrict to one expiration date (YYYY-MM-DD)
        #[arg(short, long)]
        expiration: Option<String>,

        /// Restrict to one side (call or put)
        #[arg(short = 't', long = "type")]
        option_type: Option<String>,

        #[arg(long)]
        min_delta: Option<f64>,

        #[arg(long)]
        max_delta: Option<f64>,

        #[arg(long)]
        min_strike: Option<f64>,

        #[arg(long)]
        max_strike: Option<f64>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Dispatch a raw tool call
    Tool {
        /// Path to the option-chain JSON document
        #[arg(short, long)]
        chain: PathBuf,

        /// Tool name
        #[arg(short, long)]
        name: String,

        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Print tool definitions as JSON
    Tools,
}

/// Spread filter flags shared by `spreads` and `iron-condor`.
#[derive(Args)]
struct FilterOpts {
    /// Override the chain's underlying price
    #[arg(long)]
    underlying_price: Option<f64>,

    #[arg(long)]
    expiration_type: Option<String>,

    #[arg(long)]
    settlement_type: Option<String>,

    #[arg(long)]
    option_root: Option<String>,

    #[arg(long)]
    min_delta: Option<f64>,

    #[arg(long)]
    max_delta: Option<f64>,

    /// Maximum spread width in strike points
    #[arg(long)]
    max_spread: Option<f64>,

    /// Minimum credit in dollars per contract
    #[arg(long)]
    min_credit: Option<f64>,

    #[arg(long)]
    min_open_interest: Option<u64>,

    /// Minimum short strike distance from the underlying (fraction, e.g. 0.05)
    #[arg(long)]
    dist_from_strike: Option<f64>,

    #[arg(long)]
    quantity: Option<u32>,

    #[arg(long)]
    limit: Option<usize>,
}

impl From<FilterOpts> for SpreadFilterArgs {
    fn from(opts: FilterOpts) -> Self {
        Self {
            underlying_price: opts.underlying_price,
            expiration_type: opts.expiration_type,
            settlement_type: opts.settlement_type,
            option_root: opts.option_root,
            min_delta: opts.min_delta,
            max_delta: opts.max_delta,
            max_spread: opts.max_spread,
            min_credit: opts.min_credit,
            min_open_interest: opts.min_open_interest,
            dist_from_strike: opts.dist_from_strike,
            quantity: opts.quantity,
            limit: opts.limit,
        }
    }
}

fn load_chain(path: &Path) -> Result<OptionChain> {
    let chain = OptionChain::from_path(path)
        .with_context(|| format!("Failed to load option chain from {}", path.display()))?;
    info!(
        symbol = %chain.symbol,
        contracts = chain.total_contracts(),
        expirations = chain.expirations().len(),
        "Loaded option chain"
    );
    Ok(chain)
}

fn run_tool(path: &Path, name: &str, args: serde_json::Value, settings: &Settings) -> Result<()> {
    let chain = load_chain(path)?;
    let text = handle_tool(name, args, &chain, settings)
        .with_context(|| format!("Tool '{}' failed", name))?;
    println!("{}", text);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spread_finder=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env().context("Invalid environment configuration")?;
    if let Some(format) = &cli.format {
        settings.output_format = OutputFormat::from_str(format)
            .with_context(|| format!("Unknown output format '{}'", format))?;
    }

    match cli.command {
        Commands::Spreads {
            chain,
            expiration,
            option_type,
            filters,
        } => {
            let args = FindSpreadsArgs {
                expiration_date: expiration,
                option_type,
                filters: filters.into(),
            };
            run_tool(&chain, "find_spreads", serde_json::to_value(args)?, &settings)?;
        }
        Commands::IronCondor {
            chain,
            expiration,
            filters,
        } => {
            let args = IronCondorArgs {
                expiration_date: expiration,
                filters: filters.into(),
            };
            run_tool(&chain, "find_iron_condor", serde_json::to_value(args)?, &settings)?;
        }
        Commands::Filter {
            chain,
            expiration,
            option_type,
            min_delta,
            max_delta,
            min_strike,
            max_strike,
            limit,
        } => {
            let args = FilterOptionsArgs {
                expiration_date: expiration,
                option_type,
                min_delta,
                max_delta,
                min_strike,
                max_strike,
                limit,
            };
            run_tool(&chain, "filter_options", serde_json::to_value(args)?, &settings)?;
        }
        Commands::Tool { chain, name, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("Tool arguments must be a JSON object")?;
            run_tool(&chain, &name, args, &settings)?;
        }
        Commands::Tools => {
            println!("{}", serde_json::to_string_pretty(&tool_definitions())?);
        }
    }

    Ok(())
}
