//! Fixed-length rolling price window used for charting.

use std::collections::VecDeque;

use rust_decimal::Decimal;

/// Number of points kept per symbol.
pub const HISTORY_LEN: usize = 50;

/// FIFO window that always holds exactly [`HISTORY_LEN`] prices, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory {
    points: VecDeque<Decimal>,
}

impl RollingHistory {
    /// Create a window pre-filled with `fill`.
    pub fn filled(fill: Decimal) -> Self {
        Self {
            points: std::iter::repeat(fill).take(HISTORY_LEN).collect(),
        }
    }

    /// Drop the oldest point and append `price`.
    pub fn push(&mut self, price: Decimal) {
        self.points.pop_front();
        self.points.push_back(price);
    }

    /// Points oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Decimal> + '_ {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<Decimal> {
        self.points.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<Decimal> {
        self.points.back().copied()
    }

    pub fn oldest(&self) -> Option<Decimal> {
        self.points.front().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
