use super::ui;
use crate::core::ledger::LedgerStore;
use crate::core::pnl::{ItemSummary, PnlStats, compute_pnl, item_summaries};
use anyhow::Result;
use comfy_table::Cell;

impl PnlStats {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Statistic"), ui::header_cell("Value")]);

        table.add_row(vec![
            Cell::new("Total bought"),
            Cell::new(format!("{:.2}", self.total_bought)),
        ]);
        table.add_row(vec![
            Cell::new("Total sold"),
            Cell::new(format!("{:.2}", self.total_sold)),
        ]);
        table.add_row(vec![
            Cell::new("Total fees"),
            Cell::new(format!("{:.2}", self.total_fees)),
        ]);
        table.add_row(vec![Cell::new("Gross profit"), ui::signed_cell(self.total_profit)]);
        table.add_row(vec![Cell::new("Net profit"), ui::signed_cell(self.net_profit)]);
        table.add_row(vec![
            Cell::new("Transactions"),
            Cell::new(self.transaction_count.to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Profitable trades"),
            Cell::new(self.profitable_trades.to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Losing trades"),
            Cell::new(self.losing_trades.to_string()),
        ]);

        table.to_string()
    }
}

pub async fn show_pnl(ledger: &dyn LedgerStore, account: &str) -> Result<()> {
    let transactions = ledger.list(account).await?;
    let stats = compute_pnl(&transactions);

    println!(
        "P&L for {}\n\n{}",
        ui::style_text(account, ui::StyleType::Title),
        stats.display_as_table()
    );

    let net = format!("{:+.2}", stats.net_profit);
    let net_style = if stats.net_profit >= 0.0 {
        ui::StyleType::TotalValue
    } else {
        ui::StyleType::Error
    };
    println!(
        "\nNet Profit: {}",
        ui::style_text(&net, net_style)
    );
    Ok(())
}

fn items_table(summaries: &[ItemSummary]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Item"),
        ui::header_cell("Buys"),
        ui::header_cell("Sells"),
        ui::header_cell("Avg Buy"),
        ui::header_cell("Avg Sell"),
        ui::header_cell("P&L"),
    ]);

    for summary in summaries {
        table.add_row(vec![
            Cell::new(&summary.item_name),
            Cell::new(summary.buy_count.to_string()),
            Cell::new(summary.sell_count.to_string()),
            Cell::new(format!("{:.2}", summary.avg_buy_price)),
            Cell::new(format!("{:.2}", summary.avg_sell_price)),
            ui::signed_cell(summary.pnl),
        ]);
    }

    table.to_string()
}

pub async fn show_items(ledger: &dyn LedgerStore, account: &str) -> Result<()> {
    let transactions = ledger.list(account).await?;
    let summaries = item_summaries(&transactions);

    if summaries.is_empty() {
        println!("No transactions recorded for {account}");
        return Ok(());
    }

    println!(
        "Per-item P&L for {}\n\n{}",
        ui::style_text(account, ui::StyleType::Title),
        items_table(&summaries)
    );
    Ok(())
}
