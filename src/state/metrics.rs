//! Per-symbol price metrics.
//!
//! `StockMetrics` values are never mutated in place once shared: a commit
//! produces a new value so consumers can detect changes by pointer.

use rust_decimal::Decimal;

use crate::shared::{change_percentage, round_price, Symbol};
use crate::state::catalog::Stock;
use crate::state::history::RollingHistory;

/// Live metrics for one stock
#[derive(Debug, Clone, PartialEq)]
pub struct StockMetrics {
    pub symbol: Symbol,
    /// Reference price from the catalog
    pub base_price: Decimal,
    /// Last committed price (unrounded)
    pub current_price: Decimal,
    /// Signed change vs. base, in percent
    pub change_percentage: Decimal,
    /// Lowest committed price since initialization
    pub min_price: Decimal,
    /// Highest committed price since initialization
    pub max_price: Decimal,
    history: RollingHistory,
}

impl StockMetrics {
    /// Metrics for a freshly announced stock: everything at the base price.
    pub fn initial(stock: &Stock) -> Self {
        Self {
            symbol: stock.symbol.clone(),
            base_price: stock.base_price,
            current_price: stock.base_price,
            change_percentage: Decimal::ZERO,
            min_price: stock.base_price,
            max_price: stock.base_price,
            history: RollingHistory::filled(stock.base_price),
        }
    }

    /// Return the metrics after committing `price`, or `None` if the change
    /// percentage cannot be represented.
    pub fn with_price(&self, price: Decimal) -> Option<Self> {
        let change_percentage = change_percentage(self.base_price, price)?;
        let mut history = self.history.clone();
        history.push(round_price(price));

        Some(Self {
            symbol: self.symbol.clone(),
            base_price: self.base_price,
            current_price: price,
            change_percentage,
            min_price: self.min_price.min(price),
            max_price: self.max_price.max(price),
            history,
        })
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }
}
