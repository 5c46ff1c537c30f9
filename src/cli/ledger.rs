use super::ui;
use crate::core::import::{add_manual, import_market_history, read_export_file};
use crate::core::ledger::{LedgerStore, Side, Transaction};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use std::path::Path;
use std::str::FromStr;

pub async fn add_transaction(
    ledger: &dyn LedgerStore,
    account: &str,
    item_name: &str,
    side: &str,
    price: f64,
    fee: f64,
    time: Option<DateTime<Utc>>,
) -> Result<()> {
    let timestamp = time.unwrap_or_else(Utc::now);
    let tx = add_manual(ledger, account, item_name, side, price, fee, timestamp).await?;
    println!(
        "Recorded {} {} at {:.2} (id {})",
        tx.side,
        tx.item_name,
        tx.price,
        ui::style_text(&tx.id, ui::StyleType::Subtle)
    );
    Ok(())
}

pub async fn import_file(ledger: &dyn LedgerStore, account: &str, file: &Path) -> Result<()> {
    let records = read_export_file(file)?;
    let report = import_market_history(ledger, account, &records).await?;

    println!(
        "Imported {}, skipped {} duplicates, {} failed (of {})",
        ui::style_text(&report.imported.to_string(), ui::StyleType::TotalValue),
        report.skipped,
        if report.failed > 0 {
            ui::style_text(&report.failed.to_string(), ui::StyleType::Error)
        } else {
            report.failed.to_string()
        },
        report.total
    );
    Ok(())
}

pub async fn remove_transaction(ledger: &dyn LedgerStore, account: &str, id: &str) -> Result<()> {
    if ledger.remove(account, id).await? {
        println!("Removed transaction {id}");
    } else {
        println!(
            "{}",
            ui::style_text(&format!("No transaction {id} for {account}"), ui::StyleType::Error)
        );
    }
    Ok(())
}

fn transactions_table(transactions: &[Transaction]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("Side"),
        ui::header_cell("Item"),
        ui::header_cell("Price"),
        ui::header_cell("Fee"),
        ui::header_cell("Net"),
        ui::header_cell("Source"),
    ]);

    for tx in transactions {
        table.add_row(vec![
            Cell::new(tx.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(tx.side.to_string()),
            Cell::new(&tx.item_name),
            Cell::new(format!("{:.2}", tx.price)),
            Cell::new(format!("{:.2}", tx.fee)),
            ui::signed_cell(tx.net_amount),
            Cell::new(tx.source.to_string()),
        ]);
    }

    table.to_string()
}

pub async fn list_transactions(
    ledger: &dyn LedgerStore,
    account: &str,
    side: Option<&str>,
) -> Result<()> {
    let side = side.map(Side::from_str).transpose()?;

    let mut transactions = ledger.list(account).await?;
    if let Some(side) = side {
        transactions.retain(|tx| tx.side == side);
    }
    // Newest first for reading; the P&L engine orders for itself
    transactions.sort_by_key(|tx| std::cmp::Reverse(tx.timestamp));

    if transactions.is_empty() {
        println!("No transactions recorded for {account}");
        return Ok(());
    }

    println!(
        "Transactions for {}\n\n{}",
        ui::style_text(account, ui::StyleType::Title),
        transactions_table(&transactions)
    );
    Ok(())
}
