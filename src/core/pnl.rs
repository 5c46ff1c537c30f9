//! FIFO P&L matching engine.
//!
//! A pure fold over the transaction history: no state of its own, re-derivable
//! at any time from the ledger. Each transaction is one indivisible lot.

use crate::core::ledger::{Side, Transaction};
use serde::Serialize;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Aggregate profit/loss statistics for an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PnlStats {
    pub total_bought: f64,
    pub total_sold: f64,
    pub total_profit: f64,
    pub total_fees: f64,
    pub net_profit: f64,
    pub transaction_count: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
}

/// Open buy lots for one item, oldest first.
#[derive(Debug, Default)]
pub struct LotQueue(VecDeque<f64>);

impl LotQueue {
    fn push(&mut self, buy_price: f64) {
        self.0.push_back(buy_price);
    }

    fn pop_oldest(&mut self) -> Option<f64> {
        self.0.pop_front()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }
}

/// Sorts a history by timestamp ascending, the order FIFO matching requires.
/// The ledger store does not guarantee any ordering.
fn in_event_order(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|tx| tx.timestamp);
    ordered
}

/// Rebuilds the per-item queues of open buy lots left after FIFO matching.
pub fn open_lots(transactions: &[Transaction]) -> HashMap<String, LotQueue> {
    let mut queues: HashMap<String, LotQueue> = HashMap::new();

    for tx in in_event_order(transactions) {
        let queue = queues.entry(tx.item_name.clone()).or_default();
        match tx.side {
            Side::Buy => queue.push(tx.price),
            Side::Sell => {
                queue.pop_oldest();
            }
        }
    }

    queues.retain(|_, queue| !queue.is_empty());
    queues
}

/// Computes realized P&L statistics over the full history.
///
/// Aggregate totals sum every transaction. Profitable/losing counts come only
/// from FIFO-matched buy/sell pairs per item; a sell with no open buy lot
/// counts toward totals but is classified as neither, and so is a tie.
pub fn compute_pnl(transactions: &[Transaction]) -> PnlStats {
    let mut stats = PnlStats {
        transaction_count: transactions.len(),
        ..Default::default()
    };

    let mut queues: HashMap<&str, LotQueue> = HashMap::new();

    for tx in in_event_order(transactions) {
        stats.total_fees += tx.fee;
        let queue = queues.entry(tx.item_name.as_str()).or_default();
        match tx.side {
            Side::Buy => {
                stats.total_bought += tx.price;
                queue.push(tx.price);
            }
            Side::Sell => {
                stats.total_sold += tx.price;
                if let Some(buy_price) = queue.pop_oldest() {
                    if tx.price > buy_price {
                        stats.profitable_trades += 1;
                    } else if tx.price < buy_price {
                        stats.losing_trades += 1;
                    }
                }
            }
        }
    }

    stats.total_profit = stats.total_sold - stats.total_bought;
    stats.net_profit = stats.total_profit - stats.total_fees;
    stats
}

/// Per-item aggregate, ordered by descending `pnl`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemSummary {
    pub item_name: String,
    pub total_bought: f64,
    pub total_sold: f64,
    pub buy_count: usize,
    pub sell_count: usize,
    pub avg_buy_price: f64,
    pub avg_sell_price: f64,
    pub pnl: f64,
}

pub fn item_summaries(transactions: &[Transaction]) -> Vec<ItemSummary> {
    let mut by_item: HashMap<&str, ItemSummary> = HashMap::new();

    for tx in transactions {
        let summary = by_item
            .entry(tx.item_name.as_str())
            .or_insert_with(|| ItemSummary {
                item_name: tx.item_name.clone(),
                ..Default::default()
            });
        match tx.side {
            Side::Buy => {
                summary.total_bought += tx.price;
                summary.buy_count += 1;
            }
            Side::Sell => {
                summary.total_sold += tx.price;
                summary.sell_count += 1;
            }
        }
    }

    let mut summaries: Vec<ItemSummary> = by_item
        .into_values()
        .map(|mut summary| {
            if summary.buy_count > 0 {
                summary.avg_buy_price = summary.total_bought / summary.buy_count as f64;
            }
            if summary.sell_count > 0 {
                summary.avg_sell_price = summary.total_sold / summary.sell_count as f64;
            }
            summary.pnl = summary.total_sold - summary.total_bought;
            summary
        })
        .collect();

    summaries.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
    summaries
}
