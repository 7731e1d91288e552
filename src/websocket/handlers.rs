//! Message handlers for WebSocket events.
//!
//! Decodes raw text frames and routes each decoded message to the controller
//! commands it implies.

use crate::controller::Command;
use crate::websocket::error::WebSocketError;
use crate::websocket::types::InboundMessage;

/// Decode one text frame.
pub fn parse_message(text: &str) -> Result<InboundMessage, WebSocketError> {
    serde_json::from_str(text).map_err(WebSocketError::from)
}

/// Commands implied by a decoded message, in application order.
///
/// Batched `stocks-update` payloads yield one `Tick` per symbol, ordered by
/// symbol.
pub fn commands_for(message: InboundMessage) -> Vec<Command> {
    match message {
        InboundMessage::Connected(data) => vec![Command::CatalogReceived {
            message: data.message,
            supported_symbols: data.supported_symbols,
            stocks: data.stocks_data,
        }],
        InboundMessage::StocksUpdate(data) => data
            .stocks
            .into_iter()
            .map(|(symbol, price)| Command::Tick { symbol, price })
            .collect(),
        InboundMessage::Unknown => Vec::new(),
    }
}
