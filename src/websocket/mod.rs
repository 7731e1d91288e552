//! WebSocket layer for the stock feed.
//!
//! Wire types, errors and message routing compile everywhere; the
//! tokio-tungstenite connection manager and session driver need the
//! `native` feature.

pub mod error;
pub mod handlers;
pub mod types;

#[cfg(feature = "native")]
pub mod client;
#[cfg(feature = "native")]
pub mod session;

pub use error::{WebSocketError, WsResult};
pub use handlers::{commands_for, parse_message};
pub use types::*;

#[cfg(feature = "native")]
pub use client::{ConnectionManager, WebSocketConfig};
#[cfg(feature = "native")]
pub use session::{Change, Session};

pub use crate::shared::ConnectionState;
