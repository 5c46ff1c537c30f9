use super::ui;
use crate::core::resolver::PriceResolver;
use anyhow::Result;
use comfy_table::Cell;

pub async fn show_price(resolver: &PriceResolver, item_name: &str) -> Result<()> {
    let pb = ui::new_spinner("Resolving price...");
    let resolved = resolver.resolve_price(item_name).await;
    pb.finish_and_clear();

    match resolved {
        Some(resolved) => {
            let marker = if resolved.is_stale() { " (stale)" } else { "" };
            println!(
                "{}: {} USD via {}{}",
                ui::style_text(item_name, ui::StyleType::Title),
                ui::style_text(&format!("{:.2}", resolved.price), ui::StyleType::TotalValue),
                resolved.source,
                ui::style_text(marker, ui::StyleType::Subtle),
            );
        }
        None => {
            println!(
                "{}: {}",
                ui::style_text(item_name, ui::StyleType::Title),
                ui::style_text("no price available", ui::StyleType::Error),
            );
        }
    }
    Ok(())
}

pub async fn show_comparison(resolver: &PriceResolver, item_name: &str) -> Result<()> {
    let pb = ui::new_spinner("Querying both markets...");
    let quote = resolver.dual_price(item_name).await;
    pb.finish_and_clear();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Source"),
        ui::header_cell("Price (USD)"),
    ]);
    table.add_row(vec![
        Cell::new("csfloat"),
        ui::format_optional_cell(quote.primary_price, |p| format!("{p:.2}")),
    ]);
    table.add_row(vec![
        Cell::new("steam_market"),
        ui::format_optional_cell(quote.secondary_price, |p| format!("{p:.2}")),
    ]);

    println!(
        "{}\n\n{}",
        ui::style_text(item_name, ui::StyleType::Title),
        table
    );

    match (quote.best_price, quote.best_source) {
        (Some(price), Some(source)) => println!(
            "\nBest price: {} via {}",
            ui::style_text(&format!("{price:.2}"), ui::StyleType::TotalValue),
            source
        ),
        _ => println!(
            "\n{}",
            ui::style_text("Neither market returned a price", ui::StyleType::Error)
        ),
    }
    Ok(())
}
