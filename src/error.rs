//! Unified crate error types.

use thiserror::Error;

use crate::config::ConfigError;
use crate::state::CatalogError;
use crate::websocket::WebSocketError;

/// Top-level error.
#[derive(Error, Debug)]
pub enum StockwatchError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WebSocketError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

pub type StockwatchResult<T> = Result<T, StockwatchError>;
