//! Root controller.
//!
//! All state changes go through [`Controller::handle`], which applies one
//! [`Command`] and returns the [`Effects`] the caller must carry out. The
//! controller performs no I/O.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;

use crate::engine::{RollingMetricsEngine, TickOutcome};
use crate::shared::{ConnectionState, Symbol};
use crate::state::{CatalogStore, Stock, StockMetrics};
use crate::subscriptions::SubscriptionRegistry;
use crate::websocket::handlers::commands_for;
use crate::websocket::types::{InboundMessage, OutboundMessage};

/// Discrete state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// User asked to follow a symbol
    AddSubscription(Symbol),
    /// User confirmed removal of a symbol
    RemoveSubscription(Symbol),
    /// One price observation from the feed
    Tick { symbol: Symbol, price: Decimal },
    SetThrottle(Duration),
    ConnectionStateChanged(ConnectionState),
    /// Payload of the `connected` event
    CatalogReceived {
        message: String,
        supported_symbols: Vec<Symbol>,
        stocks: Vec<Stock>,
    },
    /// Commit throttled ticks that are due
    FlushThrottled,
    /// Unsubscribe everything before shutting down
    Teardown,
}

/// Work produced by a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    /// Control messages to send, in order
    pub outbound: Vec<OutboundMessage>,
    /// Symbols whose metrics were replaced
    pub committed: Vec<Symbol>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.committed.is_empty()
    }

    fn extend(&mut self, other: Effects) {
        self.outbound.extend(other.outbound);
        self.committed.extend(other.committed);
    }

    fn send(message: Option<OutboundMessage>) -> Self {
        Self {
            outbound: message.into_iter().collect(),
            committed: Vec::new(),
        }
    }
}

/// Everything the presentation layer renders from
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub connection: ConnectionState,
    /// Greeting from the last `connected` event
    pub welcome_message: Option<String>,
    pub supported_symbols: Vec<Symbol>,
    pub catalog: CatalogStore,
    pub engine: RollingMetricsEngine,
    pub subscriptions: SubscriptionRegistry,
}

/// A subscribed stock paired with its live metrics
#[derive(Debug, Clone)]
pub struct StockView<'a> {
    pub stock: &'a Stock,
    pub metrics: &'a Arc<StockMetrics>,
}

#[derive(Debug, Clone, Default)]
pub struct Controller {
    state: AppState,
}

impl Controller {
    pub fn new<I, S>(initial_symbols: I, throttle: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self {
            state: AppState {
                engine: RollingMetricsEngine::new(throttle),
                subscriptions: SubscriptionRegistry::with_symbols(initial_symbols),
                ..Default::default()
            },
        }
    }

    /// Apply one command observed at `now`.
    pub fn handle(&mut self, command: Command, now: Instant) -> Effects {
        let state = &mut self.state;
        match command {
            Command::AddSubscription(symbol) => {
                if state.catalog.is_populated() && !state.catalog.contains(symbol.as_str()) {
                    tracing::warn!("Cannot subscribe to {}: not in catalog", symbol);
                    return Effects::default();
                }
                Effects::send(state.subscriptions.subscribe(symbol, state.connection))
            }

            Command::RemoveSubscription(symbol) => {
                Effects::send(state.subscriptions.unsubscribe(symbol.as_str(), state.connection))
            }

            Command::Tick { symbol, price } => match state.engine.apply_tick(&symbol, price, now) {
                TickOutcome::Committed => Effects {
                    outbound: Vec::new(),
                    committed: vec![symbol],
                },
                TickOutcome::Deferred { .. }
                | TickOutcome::UnknownSymbol
                | TickOutcome::Rejected => Effects::default(),
            },

            Command::SetThrottle(interval) => {
                tracing::info!("Throttle set to {:?}", interval);
                state.engine.set_throttle(interval);
                Effects::default()
            }

            Command::ConnectionStateChanged(next) => {
                let previous = std::mem::replace(&mut state.connection, next);
                if next == ConnectionState::Connected && previous != ConnectionState::Connected {
                    Effects::send(state.subscriptions.resync())
                } else {
                    Effects::default()
                }
            }

            Command::CatalogReceived {
                message,
                supported_symbols,
                stocks,
            } => {
                state.welcome_message = Some(message);
                state.supported_symbols = supported_symbols;
                self.populate_catalog(stocks)
            }

            Command::FlushThrottled => Effects {
                outbound: Vec::new(),
                committed: state.engine.flush_due(now),
            },

            Command::Teardown => Effects::send(state.subscriptions.teardown(state.connection)),
        }
    }

    fn populate_catalog(&mut self, stocks: Vec<Stock>) -> Effects {
        let state = &mut self.state;
        if state.catalog.is_populated() {
            tracing::debug!("Catalog already populated, keeping existing metrics");
            return Effects::default();
        }
        if let Err(e) = state.catalog.set_catalog(stocks) {
            tracing::warn!("Failed to populate catalog: {}", e);
            return Effects::default();
        }
        state.engine.initialize(state.catalog.all());

        // Drop subscriptions the server does not know about
        let unknown: Vec<Symbol> = state
            .subscriptions
            .current_set()
            .iter()
            .filter(|s| !state.catalog.contains(s.as_str()))
            .cloned()
            .collect();

        let mut effects = Effects::default();
        for symbol in unknown {
            tracing::warn!("Dropping subscription to unknown symbol {}", symbol);
            effects.extend(Effects::send(
                state.subscriptions.unsubscribe(symbol.as_str(), state.connection),
            ));
        }
        effects
    }

    /// Apply a decoded server message.
    pub fn handle_inbound(&mut self, message: InboundMessage, now: Instant) -> Effects {
        if message == InboundMessage::Unknown {
            tracing::debug!("Ignoring unknown event");
        }

        let mut effects = Effects::default();
        for command in commands_for(message) {
            effects.extend(self.handle(command, now));
        }
        effects
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Subscribed stocks with metrics, in subscription order
    pub fn visible(&self) -> Vec<StockView<'_>> {
        let state = &self.state;
        state
            .subscriptions
            .current_set()
            .iter()
            .filter_map(|symbol| {
                let stock = state.catalog.get(symbol.as_str())?;
                let metrics = state.engine.get(symbol.as_str())?;
                Some(StockView { stock, metrics })
            })
            .collect()
    }

    /// Catalog stocks not yet subscribed, in catalog order
    pub fn available_to_add(&self) -> Vec<&Stock> {
        self.state
            .catalog
            .all()
            .iter()
            .filter(|stock| !self.state.subscriptions.contains(stock.symbol.as_str()))
            .collect()
    }

    /// When the next [`Command::FlushThrottled`] has work
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.engine.next_deadline()
    }
}
