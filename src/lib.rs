//! # stockwatch
//!
//! Real-time stock subscriptions and rolling price metrics over WebSocket.
//!
//! ## Modules
//!
//! - [`websocket`]: wire types, connection manager and session driver
//! - [`controller`]: single owner of application state, driven by commands
//! - [`engine`]: per-symbol rolling metrics with a leading+trailing throttle
//! - [`subscriptions`]: the ordered set of followed symbols
//! - [`state`]: catalog, price history and metrics containers
//!
//! Plus shared modules:
//! - [`shared`]: symbols, connection state and price arithmetic
//! - [`config`] / [`network`]: defaults and environment overrides
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stockwatch::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> StockwatchResult<()> {
//!     let mut session = Session::new(SessionConfig::from_env()?);
//!     session.start().await?;
//!
//!     while let Some(change) = session.next_change().await {
//!         if let Change::Committed(_) = change {
//!             for view in session.controller().visible() {
//!                 println!("{} {}", view.stock.symbol, view.metrics.current_price);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// ============================================================================
// MODULES
// ============================================================================

pub mod shared;

/// Network URL constants and connection defaults.
pub mod network;

pub mod config;
pub mod error;

pub mod state;

pub mod engine;

pub mod subscriptions;

pub mod controller;

/// WebSocket transport. The connection manager requires the `native` feature.
pub mod websocket;

// ============================================================================
// PRELUDE
// ============================================================================

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use stockwatch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigError, SessionConfig, WebSocketConfig};
    pub use crate::controller::{AppState, Command, Controller, Effects, StockView};
    pub use crate::engine::{RollingMetricsEngine, TickOutcome, DEFAULT_THROTTLE_MS};
    pub use crate::error::{StockwatchError, StockwatchResult};
    pub use crate::network::{DEFAULT_WS_URL, RECONNECT_INTERVAL_MS};
    pub use crate::shared::{
        change_percentage, format_percentage, format_price, format_sparkline, round_price,
        ConnectionState, Symbol,
    };
    pub use crate::state::{CatalogStore, RollingHistory, Stock, StockMetrics, HISTORY_LEN};
    pub use crate::subscriptions::SubscriptionRegistry;
    pub use crate::websocket::{
        InboundMessage, OutboundMessage, WebSocketError, WsEvent, WsResult,
    };

    #[cfg(feature = "native")]
    pub use crate::websocket::{Change, ConnectionManager, Session};
}
