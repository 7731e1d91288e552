//! Session driver.
//!
//! Connects a [`ConnectionManager`] to a [`Controller`]: connection events and
//! throttle deadlines go in, outbound control messages come out. Everything
//! runs on the caller's task.

use std::time::Instant;

use crate::config::SessionConfig;
use crate::controller::{Command, Controller, Effects};
use crate::shared::{ConnectionState, Symbol};
use crate::websocket::client::ConnectionManager;
use crate::websocket::error::WsResult;
use crate::websocket::types::{InboundMessage, OutboundMessage, WsEvent};

/// What changed after one step of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Connection(ConnectionState),
    /// `connected` event handled; carries the welcome message
    Catalog { message: String },
    /// Metrics replaced for these symbols (may be empty when ticks were deferred)
    Committed(Vec<Symbol>),
    Disconnected { reason: String },
    /// Event with no effect on state
    Ignored,
}

enum Wake {
    Event(Option<WsEvent>),
    Deadline,
}

pub struct Session {
    connection: ConnectionManager,
    controller: Controller,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            connection: ConnectionManager::new(config.websocket),
            controller: Controller::new(config.initial_symbols, config.throttle),
        }
    }

    /// Start the connection task.
    pub async fn start(&mut self) -> WsResult<()> {
        self.connection.connect().await
    }

    /// Apply a command now and send whatever it produces.
    pub fn dispatch(&mut self, command: Command) -> Effects {
        let effects = self.controller.handle(command, Instant::now());
        self.send_all(&effects.outbound);
        effects
    }

    fn send_all(&self, outbound: &[OutboundMessage]) {
        for message in outbound {
            if let Err(e) = self.connection.send(message) {
                tracing::warn!(
                    "Failed to send {} for {:?}: {}",
                    message.event(),
                    message.stocks(),
                    e
                );
            }
        }
    }

    /// Wait for the next connection event or throttle deadline and apply it.
    ///
    /// Cancel-safe: nothing is applied until an event or deadline is taken.
    /// Returns `None` once the event channel is closed.
    pub async fn next_change(&mut self) -> Option<Change> {
        let deadline = self.controller.next_deadline();
        let wake = tokio::select! {
            event = self.connection.next_event() => Wake::Event(event),
            _ = sleep_until(deadline) => Wake::Deadline,
        };

        let change = match wake {
            Wake::Deadline => {
                let effects = self.dispatch(Command::FlushThrottled);
                Change::Committed(effects.committed)
            }
            Wake::Event(None) => return None,
            Wake::Event(Some(WsEvent::StateChanged(state))) => {
                self.dispatch(Command::ConnectionStateChanged(state));
                Change::Connection(state)
            }
            Wake::Event(Some(WsEvent::Disconnected { reason })) => Change::Disconnected { reason },
            Wake::Event(Some(WsEvent::Message(message))) => {
                let change = match &message {
                    InboundMessage::Connected(data) => Change::Catalog {
                        message: data.message.clone(),
                    },
                    InboundMessage::StocksUpdate(_) => Change::Committed(Vec::new()),
                    InboundMessage::Unknown => Change::Ignored,
                };
                let effects = self.controller.handle_inbound(message, Instant::now());
                self.send_all(&effects.outbound);
                match change {
                    Change::Committed(_) => Change::Committed(effects.committed),
                    other => other,
                }
            }
        };
        Some(change)
    }

    /// Unsubscribe the full set, then close the socket.
    pub async fn shutdown(&mut self) -> WsResult<()> {
        self.dispatch(Command::Teardown);
        self.connection.disconnect().await
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.connection_state()
    }

    pub fn url(&self) -> &str {
        self.connection.url()
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}
