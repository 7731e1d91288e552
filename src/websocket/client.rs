//! WebSocket connection manager.
//!
//! Owns one logical session to the price feed. A background task holds the
//! socket, reconnects on a flat interval forever, and reports every state
//! transition and decoded message through an event channel.

use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub use crate::config::WebSocketConfig;
use crate::shared::ConnectionState;
use crate::websocket::error::{WebSocketError, WsResult};
use crate::websocket::handlers::parse_message;
use crate::websocket::types::{OutboundMessage, WsEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Internal command for the connection task
enum ConnectionCommand {
    Send(String),
    Disconnect,
}

/// Why a phase of the connection task ended
enum TaskExit {
    /// Socket lost or never opened; retry after the interval
    Retry,
    /// Disconnect requested or the manager was dropped
    Shutdown,
}

pin_project! {
    /// Connection manager for the stock feed
    ///
    /// # Example
    ///
    /// ```ignore
    /// use stockwatch::websocket::*;
    ///
    /// let mut manager = ConnectionManager::new(WebSocketConfig::new("ws://localhost:8080"));
    /// manager.connect().await?;
    ///
    /// while let Some(event) = manager.next_event().await {
    ///     if let WsEvent::StateChanged(ConnectionState::Connected) = event {
    ///         manager.send(&OutboundMessage::subscribe(vec!["IET".into()]))?;
    ///     }
    /// }
    /// ```
    pub struct ConnectionManager {
        config: WebSocketConfig,
        state: Arc<AtomicU8>,
        cmd_tx: Option<mpsc::Sender<ConnectionCommand>>,
        #[pin]
        event_rx: mpsc::Receiver<WsEvent>,
        event_tx: mpsc::Sender<WsEvent>,
        connection_task_handle: Option<tokio::task::JoinHandle<()>>,
    }

    impl PinnedDrop for ConnectionManager {
        fn drop(this: Pin<&mut Self>) {
            let this = this.project();
            if let Some(handle) = this.connection_task_handle.take() {
                handle.abort();
            }
        }
    }
}

impl ConnectionManager {
    /// Create an idle manager. Nothing happens until [`connect`](Self::connect).
    pub fn new(config: WebSocketConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
        Self {
            config,
            state: Arc::new(AtomicU8::new(ConnectionState::Connecting as u8)),
            cmd_tx: None,
            event_rx,
            event_tx,
            connection_task_handle: None,
        }
    }

    /// Validate the URL and start the background connection task.
    pub async fn connect(&mut self) -> WsResult<()> {
        if self.is_task_running() {
            return Err(WebSocketError::AlreadyConnected);
        }
        validate_url(&self.config.url)?;

        let (cmd_tx, cmd_rx) = mpsc::channel(self.config.command_channel_capacity);
        self.cmd_tx = Some(cmd_tx);

        let ctx = ConnectionContext {
            config: self.config.clone(),
            state: self.state.clone(),
            event_tx: self.event_tx.clone(),
        };
        self.connection_task_handle = Some(tokio::spawn(connection_task(ctx, cmd_rx)));

        tracing::info!("Connection task started for {}", self.config.url);
        Ok(())
    }

    /// Queue a control message. Fails unless the socket is open.
    ///
    /// Never waits, so callers can use it from inside `select!` arms.
    pub fn send(&self, message: &OutboundMessage) -> WsResult<()> {
        if !self.is_connected() {
            return Err(WebSocketError::NotConnected);
        }
        let tx = self.cmd_tx.as_ref().ok_or(WebSocketError::NotConnected)?;
        let json = serde_json::to_string(message)?;
        tx.try_send(ConnectionCommand::Send(json))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    WebSocketError::SendFailed("command channel full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => WebSocketError::ChannelClosed,
            })
    }

    /// Next connection event, or `None` once the manager can produce no more.
    pub async fn next_event(&mut self) -> Option<WsEvent> {
        self.event_rx.recv().await
    }

    /// Close the socket and stop reconnecting.
    pub async fn disconnect(&mut self) -> WsResult<()> {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(ConnectionCommand::Disconnect).await;
        }

        if let Some(handle) = self.connection_task_handle.take() {
            let _ = handle.await;
        }

        self.state
            .store(ConnectionState::Connecting as u8, Ordering::SeqCst);
        tracing::info!("Disconnected from {}", self.config.url);
        Ok(())
    }

    /// Check if the connection task is still running
    pub fn is_task_running(&self) -> bool {
        self.connection_task_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn connection_state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == ConnectionState::Connected
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl Stream for ConnectionManager {
    type Item = WsEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        this.event_rx.poll_recv(cx)
    }
}

fn validate_url(url: &str) -> WsResult<()> {
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(WebSocketError::InvalidUrl(format!(
            "{} (expected ws:// or wss://)",
            url
        )));
    }
    url.into_client_request()
        .map(|_| ())
        .map_err(|e| WebSocketError::InvalidUrl(e.to_string()))
}

/// Shared context for the connection task
struct ConnectionContext {
    config: WebSocketConfig,
    state: Arc<AtomicU8>,
    event_tx: mpsc::Sender<WsEvent>,
}

impl ConnectionContext {
    /// Publish a state transition. Returns false once the manager is gone.
    async fn set_state(&self, state: ConnectionState) -> bool {
        self.state.store(state as u8, Ordering::SeqCst);
        tracing::info!("Connection to {} is {}", self.config.url, state);
        self.event_tx.send(WsEvent::StateChanged(state)).await.is_ok()
    }

    async fn emit(&self, event: WsEvent) -> bool {
        self.event_tx.send(event).await.is_ok()
    }
}

/// Connection task: connect, serve, wait, repeat.
async fn connection_task(ctx: ConnectionContext, mut cmd_rx: mpsc::Receiver<ConnectionCommand>) {
    loop {
        if !ctx.set_state(ConnectionState::Connecting).await {
            return;
        }

        let attempt = connect_once(&ctx.config);
        tokio::pin!(attempt);
        let result = loop {
            tokio::select! {
                result = &mut attempt => break result,
                cmd = cmd_rx.recv() => {
                    if let TaskExit::Shutdown = drop_while_offline(cmd) {
                        return;
                    }
                }
            }
        };

        match result {
            Ok(stream) => {
                if !ctx.set_state(ConnectionState::Connected).await {
                    return;
                }
                if let TaskExit::Shutdown = run_connected(stream, &mut cmd_rx, &ctx).await {
                    return;
                }
            }
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", ctx.config.url, e);
                if !ctx.set_state(ConnectionState::Error).await {
                    return;
                }
            }
        }

        if let TaskExit::Shutdown = wait_for_retry(&ctx, &mut cmd_rx).await {
            return;
        }
    }
}

async fn connect_once(config: &WebSocketConfig) -> WsResult<WsStream> {
    let (stream, _) = tokio::time::timeout(config.connect_timeout(), connect_async(config.url.as_str()))
        .await
        .map_err(|_| WebSocketError::Timeout)?
        .map_err(|e| WebSocketError::ConnectionFailed {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
    Ok(stream)
}

/// Serve an open socket until it is lost or a disconnect is requested.
async fn run_connected(
    stream: WsStream,
    cmd_rx: &mut mpsc::Receiver<ConnectionCommand>,
    ctx: &ConnectionContext,
) -> TaskExit {
    let (mut sink, mut source): (WsSink, WsSource) = stream.split();

    let reason = loop {
        tokio::select! {
            msg = source.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match parse_message(text.as_str()) {
                        Ok(message) => {
                            // Use try_send so a slow consumer cannot stall the socket
                            match ctx.event_tx.try_send(WsEvent::Message(message)) {
                                Ok(_) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    tracing::warn!("Event channel full, dropping message");
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => {
                                    tracing::debug!("Event receiver dropped");
                                    return TaskExit::Shutdown;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Ignoring malformed message: {}", e);
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            tracing::warn!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let err = match frame {
                            Some(f) => WebSocketError::ConnectionClosed {
                                code: f.code.into(),
                                reason: f.reason.as_str().to_string(),
                            },
                            None => WebSocketError::ConnectionClosed {
                                code: 1005,
                                reason: "no reason".to_string(),
                            },
                        };
                        break err.to_string();
                    }
                    Some(Ok(_)) => {
                        // Pong, binary and raw frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        break WebSocketError::from(e).to_string();
                    }
                    None => {
                        break "Stream ended".to_string();
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ConnectionCommand::Send(text)) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            tracing::warn!("Failed to send message: {}", e);
                        }
                    }
                    Some(ConnectionCommand::Disconnect) | None => {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "Client disconnect".into(),
                            })))
                            .await;
                        return TaskExit::Shutdown;
                    }
                }
            }
        }
    };

    tracing::warn!("Connection to {} lost: {}", ctx.config.url, reason);
    if !ctx.set_state(ConnectionState::Error).await {
        return TaskExit::Shutdown;
    }
    if !ctx.emit(WsEvent::Disconnected { reason }).await {
        return TaskExit::Shutdown;
    }
    TaskExit::Retry
}

/// Sleep the flat reconnect interval, dropping sends and honouring disconnect.
async fn wait_for_retry(
    ctx: &ConnectionContext,
    cmd_rx: &mut mpsc::Receiver<ConnectionCommand>,
) -> TaskExit {
    let delay = ctx.config.reconnect_interval();
    tracing::info!("Reconnecting to {} in {:?}", ctx.config.url, delay);

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return TaskExit::Retry,
            cmd = cmd_rx.recv() => {
                if let TaskExit::Shutdown = drop_while_offline(cmd) {
                    return TaskExit::Shutdown;
                }
            }
        }
    }
}

fn drop_while_offline(cmd: Option<ConnectionCommand>) -> TaskExit {
    match cmd {
        Some(ConnectionCommand::Send(text)) => {
            tracing::warn!("Not connected, dropping outbound message: {}", text);
            TaskExit::Retry
        }
        Some(ConnectionCommand::Disconnect) | None => TaskExit::Shutdown,
    }
}
