//! Subscription management for the stock feed.
//!
//! Tracks the symbols the user follows and produces the control messages to
//! send, including the full re-subscribe after a reconnect.

use crate::shared::{ConnectionState, Symbol};
use crate::websocket::types::OutboundMessage;

/// Insertion-ordered set of subscribed symbols.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    symbols: Vec<Symbol>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the registry, skipping duplicates.
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let mut registry = Self::new();
        for symbol in symbols {
            registry.insert(symbol.into());
        }
        registry
    }

    fn insert(&mut self, symbol: Symbol) -> bool {
        if self.contains(symbol.as_str()) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    /// Add a symbol.
    ///
    /// Returns the message to send when the symbol is new and the connection
    /// is open. Adding while offline is picked up by the next [`resync`](Self::resync).
    pub fn subscribe(&mut self, symbol: Symbol, state: ConnectionState) -> Option<OutboundMessage> {
        if !self.insert(symbol.clone()) {
            tracing::debug!("Already subscribed to {}", symbol);
            return None;
        }

        (state == ConnectionState::Connected).then(|| OutboundMessage::subscribe(vec![symbol]))
    }

    /// Remove a symbol, returning the message to send when connected.
    pub fn unsubscribe(&mut self, symbol: &str, state: ConnectionState) -> Option<OutboundMessage> {
        let idx = self.symbols.iter().position(|s| s.as_str() == symbol)?;
        let removed = self.symbols.remove(idx);

        (state == ConnectionState::Connected).then(|| OutboundMessage::unsubscribe(vec![removed]))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.as_str() == symbol)
    }

    /// Subscribed symbols in the order they were added
    pub fn current_set(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Subscribe message for the whole set, sent on every (re)connect.
    pub fn resync(&self) -> Option<OutboundMessage> {
        if self.symbols.is_empty() {
            return None;
        }
        Some(OutboundMessage::subscribe(self.symbols.clone()))
    }

    /// Unsubscribe message for the whole set, sent on shutdown.
    pub fn teardown(&self, state: ConnectionState) -> Option<OutboundMessage> {
        if self.symbols.is_empty() || state != ConnectionState::Connected {
            return None;
        }
        Some(OutboundMessage::unsubscribe(self.symbols.clone()))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
