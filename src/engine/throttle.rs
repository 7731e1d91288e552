//! Per-symbol leading+trailing throttle.
//!
//! The first tick after a quiet interval commits immediately. Ticks arriving
//! inside the interval are coalesced into a single pending commit (last price
//! wins) that fires at `last_commit + interval`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::shared::Symbol;

/// Default commit interval per symbol, in milliseconds.
pub const DEFAULT_THROTTLE_MS: u64 = 1000;

/// Result of offering a tick to the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Commit the price now
    CommitNow,
    /// Price stored as the pending commit, due at `due`
    Deferred { due: Instant },
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    price: Decimal,
    due: Instant,
}

#[derive(Debug, Clone, Default)]
struct SymbolSlot {
    last_commit: Option<Instant>,
    pending: Option<Pending>,
}

/// Throttle bookkeeping for every symbol that has seen a tick.
#[derive(Debug, Clone)]
pub struct ThrottleTable {
    interval: Duration,
    slots: HashMap<Symbol, SymbolSlot>,
}

impl Default for ThrottleTable {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_THROTTLE_MS))
    }
}

impl ThrottleTable {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            slots: HashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the interval for future admissions. Already scheduled commits
    /// keep their due time.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Offer a tick for `symbol` observed at `now`.
    ///
    /// `CommitNow` records `now` as the last commit and clears any pending
    /// price for the symbol.
    pub fn admit(&mut self, symbol: &Symbol, price: Decimal, now: Instant) -> Admission {
        let interval = self.interval;
        let slot = self.slots.entry(symbol.clone()).or_default();

        let next_allowed = slot.last_commit.map(|last| last + interval);
        match next_allowed {
            Some(due) if interval > Duration::ZERO && now < due => {
                // Re-arming keeps the original due time
                let due = slot.pending.map(|p| p.due).unwrap_or(due);
                slot.pending = Some(Pending { price, due });
                Admission::Deferred { due }
            }
            _ => {
                slot.last_commit = Some(now);
                slot.pending = None;
                Admission::CommitNow
            }
        }
    }

    /// Remove and return every pending commit due at or before `now`,
    /// ordered by due time then symbol.
    pub fn take_due(&mut self, now: Instant) -> Vec<(Symbol, Decimal)> {
        let mut due: Vec<(Instant, Symbol, Decimal)> = Vec::new();

        for (symbol, slot) in self.slots.iter_mut() {
            match slot.pending {
                Some(pending) if pending.due <= now => {
                    slot.pending = None;
                    slot.last_commit = Some(now);
                    due.push((pending.due, symbol.clone(), pending.price));
                }
                _ => {}
            }
        }

        due.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        due.into_iter().map(|(_, symbol, price)| (symbol, price)).collect()
    }

    /// Earliest pending due time, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .values()
            .filter_map(|slot| slot.pending.map(|p| p.due))
            .min()
    }

    /// Forget all per-symbol state.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
