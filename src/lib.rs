pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

pub use crate::core::config;

use crate::core::clock::SystemClock;
use crate::core::price::PriceSource;
use crate::core::resolver::PriceResolver;
use anyhow::Result;
use chrono::{DateTime, Utc};
use providers::{CsfloatSource, SteamMarketSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use store::Stores;
use tracing::{debug, info};

pub enum AppCommand {
    Pnl,
    Items,
    Value,
    History,
    Price { item: String },
    Compare { item: String },
    Add {
        item: String,
        side: String,
        price: f64,
        fee: f64,
        time: Option<DateTime<Utc>>,
    },
    Import { file: PathBuf },
    List { side: Option<String> },
    Remove { id: String },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("skinledger starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let stores = Stores::open(&config.default_data_path()?)?;

    let csfloat_url = config
        .providers
        .csfloat
        .as_ref()
        .map_or("https://csfloat.com", |p| &p.base_url);
    let steam_url = config
        .providers
        .steam
        .as_ref()
        .map_or("https://steamcommunity.com", |p| &p.base_url);
    let sources: Vec<Arc<dyn PriceSource>> = vec![
        Arc::new(CsfloatSource::new(csfloat_url)),
        Arc::new(SteamMarketSource::new(steam_url)),
    ];

    let clock = SystemClock;
    let resolver = PriceResolver::new(
        sources,
        stores.prices.clone(),
        Arc::new(SystemClock),
        Duration::from_secs(config.cache.ttl_secs),
        Duration::from_millis(config.cache.spacing_ms),
    );
    let account = &config.account;

    match command {
        AppCommand::Pnl => cli::pnl::show_pnl(stores.ledger.as_ref(), account).await,
        AppCommand::Items => cli::pnl::show_items(stores.ledger.as_ref(), account).await,
        AppCommand::Value => {
            cli::value::show_value(
                stores.ledger.as_ref(),
                stores.snapshots.as_ref(),
                &resolver,
                &clock,
                account,
            )
            .await
        }
        AppCommand::History => cli::value::show_history(stores.snapshots.as_ref(), account).await,
        AppCommand::Price { item } => cli::price::show_price(&resolver, &item).await,
        AppCommand::Compare { item } => cli::price::show_comparison(&resolver, &item).await,
        AppCommand::Add {
            item,
            side,
            price,
            fee,
            time,
        } => {
            cli::ledger::add_transaction(
                stores.ledger.as_ref(),
                account,
                &item,
                &side,
                price,
                fee,
                time,
            )
            .await
        }
        AppCommand::Import { file } => {
            cli::ledger::import_file(stores.ledger.as_ref(), account, &file).await
        }
        AppCommand::List { side } => {
            cli::ledger::list_transactions(stores.ledger.as_ref(), account, side.as_deref()).await
        }
        AppCommand::Remove { id } => {
            cli::ledger::remove_transaction(stores.ledger.as_ref(), account, &id).await
        }
    }
}
