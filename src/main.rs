use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use skinledger::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for skinledger::AppCommand {
    fn from(cmd: Commands) -> skinledger::AppCommand {
        match cmd {
            Commands::Pnl => skinledger::AppCommand::Pnl,
            Commands::Items => skinledger::AppCommand::Items,
            Commands::Value => skinledger::AppCommand::Value,
            Commands::History => skinledger::AppCommand::History,
            Commands::Price { item } => skinledger::AppCommand::Price { item },
            Commands::Compare { item } => skinledger::AppCommand::Compare { item },
            Commands::Add {
                item,
                side,
                price,
                fee,
                time,
            } => skinledger::AppCommand::Add {
                item,
                side,
                price,
                fee,
                time,
            },
            Commands::Import { file } => skinledger::AppCommand::Import { file },
            Commands::List { side } => skinledger::AppCommand::List { side },
            Commands::Remove { id } => skinledger::AppCommand::Remove { id },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display overall profit/loss statistics
    Pnl,
    /// Display per-item profit/loss summary
    Items,
    /// Value open positions at current market prices
    Value,
    /// Display recorded inventory snapshots
    History,
    /// Resolve the current price of an item
    Price { item: String },
    /// Compare live prices across both markets
    Compare { item: String },
    /// Record a manual transaction
    Add {
        item: String,
        /// BUY or SELL
        side: String,
        price: f64,
        /// Transaction fee, defaults to none
        #[arg(long, default_value_t = 0.0)]
        fee: f64,
        /// Event time (RFC 3339), defaults to now
        #[arg(long)]
        time: Option<DateTime<Utc>>,
    },
    /// Import a market-history export file (JSON)
    Import { file: PathBuf },
    /// List recorded transactions
    List {
        /// Filter by BUY or SELL
        #[arg(long)]
        side: Option<String>,
    },
    /// Remove a transaction by id
    Remove { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => skinledger::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = skinledger::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
account: "default"

providers:
  csfloat:
    base_url: "https://csfloat.com"
  steam:
    base_url: "https://steamcommunity.com"

cache:
  ttl_secs: 300
  spacing_ms: 500
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
