//! Runtime configuration.
//!
//! Defaults come from the constants in [`crate::network`] and
//! [`crate::engine`]; [`SessionConfig::from_env`] layers environment
//! overrides on top.

use std::time::Duration;

use thiserror::Error;

use crate::engine::DEFAULT_THROTTLE_MS;
use crate::network::{DEFAULT_WS_URL, RECONNECT_INTERVAL_MS, WS_URL_ENV};
use crate::shared::Symbol;

/// Environment variable overriding the throttle interval (ms).
pub const THROTTLE_MS_ENV: &str = "STOCKWATCH_THROTTLE_MS";

/// Symbols subscribed on first start.
pub const DEFAULT_SYMBOLS: [&str; 2] = ["IET", "ZHT"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid number for {var}: {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

/// WebSocket connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebSocketConfig {
    /// Server URL (`ws://` or `wss://`)
    pub url: String,
    /// Fixed delay between reconnect attempts (ms)
    pub reconnect_interval_ms: u64,
    /// Timeout for a single connect attempt (seconds)
    pub connect_timeout_secs: u64,
    /// Capacity of the event channel. Default: 1000
    pub event_channel_capacity: usize,
    /// Capacity of the command channel. Default: 100
    pub command_channel_capacity: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            reconnect_interval_ms: RECONNECT_INTERVAL_MS,
            connect_timeout_secs: 30,
            event_channel_capacity: 1000,
            command_channel_capacity: 100,
        }
    }
}

impl WebSocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Everything needed to start a [`Session`](crate::websocket::session::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub websocket: WebSocketConfig,
    /// Symbols subscribed before any user action
    pub initial_symbols: Vec<Symbol>,
    /// Per-symbol commit interval; zero disables throttling
    pub throttle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            websocket: WebSocketConfig::default(),
            initial_symbols: DEFAULT_SYMBOLS.iter().map(|s| Symbol::from(*s)).collect(),
            throttle: Duration::from_millis(DEFAULT_THROTTLE_MS),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `STOCKWATCH_WS_URL` and `STOCKWATCH_THROTTLE_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.websocket.url = url.trim().to_string();
        }

        if let Some(raw) = lookup(THROTTLE_MS_ENV) {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                var: THROTTLE_MS_ENV,
                value: raw.clone(),
            })?;
            config.throttle = Duration::from_millis(ms);
        }

        Ok(config)
    }
}
