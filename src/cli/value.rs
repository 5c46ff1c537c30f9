use super::ui;
use crate::core::clock::Clock;
use crate::core::ledger::LedgerStore;
use crate::core::resolver::PriceResolver;
use crate::core::snapshot::{Snapshot, SnapshotStore};
use crate::core::valuation::{PortfolioValuation, value_positions};
use anyhow::Result;
use comfy_table::Cell;
use tracing::debug;

impl PortfolioValuation {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Item"),
            ui::header_cell("Lots"),
            ui::header_cell("Cost"),
            ui::header_cell("Price"),
            ui::header_cell("Value"),
            ui::header_cell("Unrealized"),
        ]);

        let mut any_stale = false;
        for position in &self.positions {
            let price_cell = match position.market_price {
                Some(price) if position.stale => {
                    any_stale = true;
                    Cell::new(format!("{price:.2}*"))
                }
                Some(price) => Cell::new(format!("{price:.2}")),
                None => ui::na_cell(position.error.is_some()),
            };
            let unrealized_cell = position
                .unrealized
                .map_or_else(|| ui::na_cell(position.error.is_some()), ui::signed_cell);

            table.add_row(vec![
                Cell::new(&position.item_name),
                Cell::new(position.open_lots.to_string()),
                Cell::new(format!("{:.2}", position.cost_basis)),
                price_cell,
                ui::format_optional_cell(position.market_value, |v| format!("{v:.2}")),
                unrealized_cell,
            ]);
        }

        let mut output = table.to_string();
        if any_stale {
            output.push_str(&format!(
                "\n{}",
                ui::style_text("* stale cached price", ui::StyleType::Subtle)
            ));
        }
        output
    }
}

pub async fn show_value(
    ledger: &dyn LedgerStore,
    snapshots: &dyn SnapshotStore,
    resolver: &PriceResolver,
    clock: &dyn Clock,
    account: &str,
) -> Result<()> {
    let transactions = ledger.list(account).await?;

    let pb = ui::new_spinner("Pricing held items...");
    let valuation = value_positions(&transactions, resolver).await;
    pb.finish_and_clear();

    if valuation.positions.is_empty() {
        println!("No open positions for {account}");
        return Ok(());
    }

    println!(
        "Holdings for {}\n\n{}",
        ui::style_text(account, ui::StyleType::Title),
        valuation.display_as_table()
    );

    let total = valuation
        .total_value
        .map_or("N/A".to_string(), |v| format!("{v:.2}"));
    let total_style = if valuation.total_value.is_some() {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };
    println!(
        "\nTotal Value: {}   Cost Basis: {}",
        ui::style_text(&total, total_style),
        ui::style_text(&format!("{:.2}", valuation.total_cost), ui::StyleType::TotalLabel),
    );
    if let Some(unrealized) = valuation.total_unrealized {
        println!("Unrealized P&L: {unrealized:+.2}");
    }

    // Snapshot only fully-priced valuations
    if let Some(total_value) = valuation.total_value {
        let snapshot = Snapshot {
            account_id: account.to_string(),
            total_value,
            total_items: valuation.total_items(),
            snapshot_date: clock.now().date_naive(),
        };
        snapshots.upsert(snapshot).await?;
        debug!("Recorded inventory snapshot");
    }

    Ok(())
}

pub async fn show_history(snapshots: &dyn SnapshotStore, account: &str) -> Result<()> {
    let rows = snapshots.list(account).await?;
    if rows.is_empty() {
        println!("No snapshots recorded for {account}");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Items"),
        ui::header_cell("Total Value"),
    ]);
    for snapshot in &rows {
        table.add_row(vec![
            Cell::new(snapshot.snapshot_date.to_string()),
            Cell::new(snapshot.total_items.to_string()),
            Cell::new(format!("{:.2}", snapshot.total_value)),
        ]);
    }

    println!(
        "Inventory history for {}\n\n{}",
        ui::style_text(account, ui::StyleType::Title),
        table
    );
    Ok(())
}
