//! Rolling metrics engine.
//!
//! Owns one [`StockMetrics`] per catalog stock and folds throttled price ticks
//! into them. Time is passed in explicitly so the engine stays deterministic;
//! the session driver supplies `Instant::now()` and wakes the engine at
//! [`RollingMetricsEngine::next_deadline`].

pub mod throttle;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::shared::Symbol;
use crate::state::{Stock, StockMetrics};

pub use throttle::{Admission, ThrottleTable, DEFAULT_THROTTLE_MS};

/// What happened to a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Metrics were updated
    Committed,
    /// Price held until `due`
    Deferred { due: Instant },
    /// Symbol has no metrics entry; tick dropped
    UnknownSymbol,
    /// Price out of range for the metrics math; tick dropped
    Rejected,
}

#[derive(Debug, Clone, Default)]
pub struct RollingMetricsEngine {
    metrics: HashMap<Symbol, Arc<StockMetrics>>,
    throttle: ThrottleTable,
}

impl RollingMetricsEngine {
    pub fn new(throttle: Duration) -> Self {
        Self {
            metrics: HashMap::new(),
            throttle: ThrottleTable::new(throttle),
        }
    }

    /// Reset metrics for every stock in `stocks` to their base price.
    ///
    /// Existing entries for other symbols are dropped along with any pending
    /// throttled commits.
    pub fn initialize(&mut self, stocks: &[Stock]) {
        self.metrics = stocks
            .iter()
            .map(|stock| (stock.symbol.clone(), Arc::new(StockMetrics::initial(stock))))
            .collect();
        self.throttle.clear();
        tracing::debug!("Metrics initialized for {} stocks", self.metrics.len());
    }

    /// Feed one price observation.
    pub fn apply_tick(&mut self, symbol: &Symbol, price: Decimal, now: Instant) -> TickOutcome {
        if !self.metrics.contains_key(symbol) {
            tracing::debug!("Dropping tick for unknown symbol {}", symbol);
            return TickOutcome::UnknownSymbol;
        }

        match self.throttle.admit(symbol, price, now) {
            Admission::CommitNow => {
                if self.commit(symbol, price) {
                    TickOutcome::Committed
                } else {
                    TickOutcome::Rejected
                }
            }
            Admission::Deferred { due } => TickOutcome::Deferred { due },
        }
    }

    /// Commit every throttled price due at or before `now`.
    ///
    /// Returns the symbols whose metrics changed, in commit order.
    pub fn flush_due(&mut self, now: Instant) -> Vec<Symbol> {
        let due = self.throttle.take_due(now);
        let mut committed = Vec::with_capacity(due.len());
        for (symbol, price) in due {
            if self.commit(&symbol, price) {
                committed.push(symbol);
            }
        }
        committed
    }

    fn commit(&mut self, symbol: &Symbol, price: Decimal) -> bool {
        let Some(entry) = self.metrics.get_mut(symbol) else {
            return false;
        };
        match entry.with_price(price) {
            Some(next) => {
                // Replace only this entry; other Arcs stay pointer-equal
                *entry = Arc::new(next);
                true
            }
            None => {
                tracing::warn!("Ignoring out-of-range price {} for {}", price, symbol);
                false
            }
        }
    }

    pub fn set_throttle(&mut self, interval: Duration) {
        self.throttle.set_interval(interval);
    }

    pub fn throttle(&self) -> Duration {
        self.throttle.interval()
    }

    /// Earliest instant at which [`flush_due`](Self::flush_due) has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttle.next_deadline()
    }

    pub fn get(&self, symbol: &str) -> Option<&Arc<StockMetrics>> {
        self.metrics.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.metrics.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
