//! Valuation of open positions at current market prices.

use crate::core::ledger::Transaction;
use crate::core::pnl::open_lots;
use crate::core::resolver::PriceResolver;
use tracing::debug;

/// One still-held item priced at the current market.
#[derive(Debug, Clone)]
pub struct PositionValue {
    pub item_name: String,
    pub open_lots: usize,
    /// Sum of the open lots' buy prices.
    pub cost_basis: f64,
    pub market_price: Option<f64>,
    pub market_value: Option<f64>,
    pub unrealized: Option<f64>,
    /// Set when the price came from an expired cache entry.
    pub stale: bool,
    pub error: Option<String>,
}

/// All open positions for an account, with totals only when every position
/// could be priced.
#[derive(Debug)]
pub struct PortfolioValuation {
    pub positions: Vec<PositionValue>,
    pub total_cost: f64,
    pub total_value: Option<f64>,
    pub total_unrealized: Option<f64>,
}

impl PortfolioValuation {
    pub fn total_items(&self) -> usize {
        self.positions.iter().map(|p| p.open_lots).sum()
    }
}

/// Rebuilds open lots from the history and prices each held item through the
/// resolver. Items whose price cannot be resolved carry an error note and
/// leave the portfolio totals unreported rather than understated.
pub async fn value_positions(
    transactions: &[Transaction],
    resolver: &PriceResolver,
) -> PortfolioValuation {
    let lots = open_lots(transactions);

    let mut names: Vec<String> = lots.keys().cloned().collect();
    names.sort();
    debug!(held_items = names.len(), "valuing open positions");

    let prices = resolver.resolve_many(&names).await;

    let mut positions = Vec::with_capacity(names.len());
    let mut total_cost = 0.0;
    let mut total_value = 0.0;
    let mut total_unrealized = 0.0;
    let mut all_priced = true;

    for name in names {
        let queue = &lots[&name];
        let cost_basis: f64 = queue.iter().sum();
        total_cost += cost_basis;

        let mut position = PositionValue {
            item_name: name.clone(),
            open_lots: queue.len(),
            cost_basis,
            market_price: None,
            market_value: None,
            unrealized: None,
            stale: false,
            error: None,
        };

        match prices.get(&name) {
            Some(resolved) => {
                let value = resolved.price * queue.len() as f64;
                position.market_price = Some(resolved.price);
                position.market_value = Some(value);
                position.unrealized = Some(value - cost_basis);
                position.stale = resolved.is_stale();
                total_value += value;
                total_unrealized += value - cost_basis;
            }
            None => {
                all_priced = false;
                position.error = Some(format!("no price available for {name}"));
            }
        }

        positions.push(position);
    }

    // Largest unrealized gain first
    positions.sort_by(|a, b| {
        b.unrealized
            .unwrap_or(f64::NEG_INFINITY)
            .total_cmp(&a.unrealized.unwrap_or(f64::NEG_INFINITY))
    });

    PortfolioValuation {
        positions,
        total_cost,
        total_value: all_priced.then_some(total_value),
        total_unrealized: all_priced.then_some(total_unrealized),
    }
}
