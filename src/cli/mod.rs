//! Command implementations and terminal presentation.

pub mod ledger;
pub mod pnl;
pub mod price;
pub mod ui;
pub mod value;
