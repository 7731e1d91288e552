//! Message types for the stock feed WebSocket protocol.
//!
//! Every frame is a JSON object discriminated by its `event` field.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::{ConnectionState, Symbol};
use crate::state::Stock;

// ============================================================================
// REQUEST TYPES (Client → Server)
// ============================================================================

/// Subscription control message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundMessage {
    Subscribe { stocks: Vec<Symbol> },
    Unsubscribe { stocks: Vec<Symbol> },
}

impl OutboundMessage {
    pub fn subscribe(stocks: Vec<Symbol>) -> Self {
        Self::Subscribe { stocks }
    }

    pub fn unsubscribe(stocks: Vec<Symbol>) -> Self {
        Self::Unsubscribe { stocks }
    }

    /// Symbols carried by the message
    pub fn stocks(&self) -> &[Symbol] {
        match self {
            Self::Subscribe { stocks } | Self::Unsubscribe { stocks } => stocks,
        }
    }

    pub fn event(&self) -> &'static str {
        match self {
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
        }
    }
}

// ============================================================================
// RESPONSE TYPES (Server → Client)
// ============================================================================

/// Decoded server frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum InboundMessage {
    /// Sent once per socket open, carries the catalog
    #[serde(rename = "connected")]
    Connected(ConnectedData),
    /// One or more price ticks
    #[serde(rename = "stocks-update")]
    StocksUpdate(StocksUpdateData),
    /// Any event this client does not handle
    #[serde(other)]
    Unknown,
}

/// Payload of the `connected` event
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedData {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub supported_symbols: Vec<Symbol>,
    #[serde(default)]
    pub stocks_data: Vec<Stock>,
}

/// Payload of the `stocks-update` event
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct StocksUpdateData {
    /// Symbol to price; ordered so batched updates apply deterministically
    pub stocks: BTreeMap<Symbol, Decimal>,
}

// ============================================================================
// CLIENT EVENTS
// ============================================================================

/// Events surfaced by the connection manager
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Connection state transition
    StateChanged(ConnectionState),
    /// Decoded server message
    Message(InboundMessage),
    /// An established connection was lost; a reconnect is scheduled
    Disconnected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_outbound_serialization() {
        let msg = OutboundMessage::subscribe(vec![Symbol::from("IET"), Symbol::from("ZHT")]);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"event":"subscribe","stocks":["IET","ZHT"]}"#);

        let msg = OutboundMessage::unsubscribe(vec![Symbol::from("IET")]);
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"event":"unsubscribe","stocks":["IET"]}"#);
        assert_eq!(msg.event(), "unsubscribe");
    }

    #[test]
    fn test_connected_deserialization() {
        let json = r#"{
            "event": "connected",
            "message": "Welcome to the stock feed",
            "supportedSymbols": ["IET", "ZHT"],
            "stocksData": [
                {"symbol": "IET", "companyName": "Iet Industries", "catchPhrase": "x", "basePrice": 100.0},
                {"symbol": "ZHT", "companyName": "Zht Holdings", "catchPhrase": "y", "basePrice": 42.17}
            ]
        }"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        match msg {
            InboundMessage::Connected(data) => {
                assert_eq!(data.message, "Welcome to the stock feed");
                assert_eq!(data.supported_symbols.len(), 2);
                assert_eq!(data.stocks_data[1].base_price, dec!(42.17));
            }
            other => panic!("Expected Connected, got {:?}", other),
        }
    }

    #[test]
    fn test_stocks_update_deserialization() {
        let json = r#"{"event":"stocks-update","stocks":{"IET":110.5}}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        match msg {
            InboundMessage::StocksUpdate(data) => {
                assert_eq!(data.stocks.get("IET"), Some(&dec!(110.5)));
            }
            other => panic!("Expected StocksUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event() {
        let json = r#"{"event":"heartbeat"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, InboundMessage::Unknown);
    }
}
