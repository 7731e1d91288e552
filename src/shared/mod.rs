//! Shared utilities and types used across the state, engine and WebSocket modules.

pub mod price;
pub mod types;

// Re-export commonly used items
pub use price::{
    change_percentage, format_percentage, format_price, format_sparkline, round_price,
};
pub use types::*;
