//! State containers.
//!
//! - `catalog`: known stocks, populated once per session
//! - `history`: fixed-length rolling price window
//! - `metrics`: per-symbol price metrics

pub mod catalog;
pub mod history;
pub mod metrics;

pub use catalog::{CatalogError, CatalogStore, Stock};
pub use history::{RollingHistory, HISTORY_LEN};
pub use metrics::StockMetrics;
