//! Network URL constants and connection defaults.

/// Default WebSocket URL of the price simulator.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080";

/// Environment variable overriding [`DEFAULT_WS_URL`].
pub const WS_URL_ENV: &str = "STOCKWATCH_WS_URL";

/// Fixed delay between reconnect attempts (ms).
pub const RECONNECT_INTERVAL_MS: u64 = 5000;
