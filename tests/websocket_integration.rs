//! Integration tests for the WebSocket session.
//!
//! Each test runs a throwaway feed server on `127.0.0.1:0`. The last test
//! talks to a real price simulator and is ignored by default.
//! Run it with: `cargo test --test websocket_integration -- --ignored`

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use serde_json::json;
use stockwatch::prelude::*;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_test::{assert_err, assert_ok};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

type ServerWs = WebSocketStream<TcpStream>;

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

fn session_config(url: &str, throttle_ms: u64) -> SessionConfig {
    SessionConfig {
        websocket: WebSocketConfig {
            url: url.to_string(),
            reconnect_interval_ms: 50,
            connect_timeout_secs: 2,
            ..Default::default()
        },
        throttle: Duration::from_millis(throttle_ms),
        ..Default::default()
    }
}

fn connected_frame(message: &str) -> Message {
    let body = json!({
        "event": "connected",
        "message": message,
        "supportedSymbols": ["IET", "ZHT", "ABC"],
        "stocksData": [
            {"symbol": "IET", "companyName": "Iet Industries", "catchPhrase": "Reinvent markets", "basePrice": 100.0},
            {"symbol": "ZHT", "companyName": "Zht Holdings", "catchPhrase": "Scale paradigms", "basePrice": 50.0},
            {"symbol": "ABC", "companyName": "Abc Labs", "catchPhrase": "Embrace synergies", "basePrice": 10.0}
        ]
    });
    Message::Text(body.to_string().into())
}

fn update_frame(symbol: &str, price: f64) -> Message {
    let mut stocks = serde_json::Map::new();
    stocks.insert(symbol.to_string(), json!(price));
    let body = json!({"event": "stocks-update", "stocks": stocks});
    Message::Text(body.to_string().into())
}

/// Next control message sent by the client, skipping non-text frames.
async fn next_outbound(ws: &mut ServerWs) -> Option<OutboundMessage> {
    while let Some(Ok(msg)) = ws.next().await {
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).ok();
        }
    }
    None
}

async fn drive_until<F>(session: &mut Session, mut pred: F) -> Change
where
    F: FnMut(&Change) -> bool,
{
    tokio::time::timeout(STEP_TIMEOUT, async {
        loop {
            match session.next_change().await {
                Some(change) if pred(&change) => return change,
                Some(_) => continue,
                None => panic!("session ended unexpectedly"),
            }
        }
    })
    .await
    .expect("timed out waiting for session change")
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for server")
        .expect("server task ended")
}

fn syms(list: &[&str]) -> Vec<Symbol> {
    list.iter().map(|s| Symbol::from(*s)).collect()
}

/// Connect, receive the catalog, subscribe the defaults, commit a tick, tear down
#[tokio::test]
async fn test_session_subscribes_and_commits_ticks() {
    let (listener, url) = bind().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(connected_frame("Welcome to the feed")).await.unwrap();
        let subscribe = next_outbound(&mut ws).await.unwrap();
        tx.send(subscribe).unwrap();
        ws.send(update_frame("IET", 110.0)).await.unwrap();
        if let Some(unsubscribe) = next_outbound(&mut ws).await {
            tx.send(unsubscribe).unwrap();
        }
    });

    let mut session = Session::new(session_config(&url, 0));
    assert_ok!(session.start().await);
    assert_err!(session.start().await);

    let change = drive_until(&mut session, |c| matches!(c, Change::Catalog { .. })).await;
    assert_eq!(
        change,
        Change::Catalog {
            message: "Welcome to the feed".to_string()
        }
    );
    assert_eq!(session.connection_state(), ConnectionState::Connected);
    assert_eq!(recv(&mut rx).await, OutboundMessage::subscribe(syms(&["IET", "ZHT"])));

    let change = drive_until(&mut session, |c| matches!(c, Change::Committed(s) if !s.is_empty())).await;
    assert_eq!(change, Change::Committed(syms(&["IET"])));

    let controller = session.controller();
    let iet = controller.state().engine.get("IET").unwrap();
    assert_eq!(iet.current_price, dec!(110.00));
    assert_eq!(round_price(iet.change_percentage), dec!(9.09));
    assert_eq!(iet.max_price, dec!(110.00));
    assert_eq!(iet.min_price, dec!(100.00));
    assert_eq!(iet.history().len(), HISTORY_LEN);

    let available: Vec<&str> = controller
        .available_to_add()
        .iter()
        .map(|s| s.symbol.as_str())
        .collect();
    assert_eq!(available, vec!["ABC"]);

    assert_ok!(session.shutdown().await);
    assert_eq!(recv(&mut rx).await, OutboundMessage::unsubscribe(syms(&["IET", "ZHT"])));
}

/// After a drop the client reconnects and re-subscribes the set as it is now
#[tokio::test]
async fn test_reconnect_resubscribes_current_set() {
    let (listener, url) = bind().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        // First connection: two subscribes, then the server drops
        let mut ws = accept(&listener).await;
        ws.send(connected_frame("Welcome")).await.unwrap();
        for _ in 0..2 {
            let msg = next_outbound(&mut ws).await.unwrap();
            tx.send(msg).unwrap();
        }
        ws.close(None).await.unwrap();
        drop(ws);

        // Second connection
        let mut ws = accept(&listener).await;
        ws.send(connected_frame("Welcome back")).await.unwrap();
        let msg = next_outbound(&mut ws).await.unwrap();
        tx.send(msg).unwrap();
        while ws.next().await.is_some() {}
    });

    let mut session = Session::new(session_config(&url, 0));
    assert_ok!(session.start().await);

    drive_until(&mut session, |c| matches!(c, Change::Catalog { .. })).await;
    assert_eq!(recv(&mut rx).await, OutboundMessage::subscribe(syms(&["IET", "ZHT"])));

    let effects = session.dispatch(Command::AddSubscription(Symbol::from("ABC")));
    assert_eq!(effects.outbound, vec![OutboundMessage::subscribe(syms(&["ABC"]))]);
    assert_eq!(recv(&mut rx).await, OutboundMessage::subscribe(syms(&["ABC"])));

    drive_until(&mut session, |c| matches!(c, Change::Disconnected { .. })).await;
    assert_eq!(
        session.controller().state().connection,
        ConnectionState::Error
    );

    // Changed while offline: nothing is sent now
    let effects = session.dispatch(Command::RemoveSubscription(Symbol::from("IET")));
    assert!(effects.outbound.is_empty());

    drive_until(&mut session, |c| {
        matches!(c, Change::Connection(ConnectionState::Connected))
    })
    .await;
    assert_eq!(recv(&mut rx).await, OutboundMessage::subscribe(syms(&["ZHT", "ABC"])));

    let change = drive_until(&mut session, |c| matches!(c, Change::Catalog { .. })).await;
    assert_eq!(
        change,
        Change::Catalog {
            message: "Welcome back".to_string()
        }
    );
    let state = session.controller().state();
    assert_eq!(state.welcome_message.as_deref(), Some("Welcome back"));
    assert_eq!(state.engine.len(), 3);

    assert_ok!(session.shutdown().await);
}

/// Garbage and unknown events are skipped, pings are answered
#[tokio::test]
async fn test_ignores_bad_frames_and_answers_pings() {
    let (listener, url) = bind().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(connected_frame("Welcome")).await.unwrap();
        next_outbound(&mut ws).await.unwrap();

        ws.send(Message::Ping(b"hb".to_vec().into())).await.unwrap();
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Pong(data) = msg {
                tx.send(data.to_vec()).unwrap();
                break;
            }
        }

        ws.send(Message::Text("{not json".into())).await.unwrap();
        ws.send(Message::Text(r#"{"event":"market-closed"}"#.into()))
            .await
            .unwrap();
        ws.send(update_frame("ZHT", 45.0)).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let mut session = Session::new(session_config(&url, 0));
    assert_ok!(session.start().await);

    assert_eq!(recv(&mut rx).await, b"hb".to_vec());

    let ignored = drive_until(&mut session, |c| matches!(c, Change::Ignored)).await;
    assert_eq!(ignored, Change::Ignored);

    let change = drive_until(&mut session, |c| matches!(c, Change::Committed(s) if !s.is_empty())).await;
    assert_eq!(change, Change::Committed(syms(&["ZHT"])));

    let zht = session.controller().state().engine.get("ZHT").unwrap();
    assert_eq!(zht.current_price, dec!(45.00));
    assert_eq!(round_price(zht.change_percentage), dec!(-10.00));
    assert_eq!(format_percentage(zht.change_percentage), "-10.00%");

    assert_ok!(session.shutdown().await);
}

/// A burst inside the throttle window commits the first and the last price
#[tokio::test]
async fn test_throttle_coalesces_burst() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let mut ws = accept(&listener).await;
        ws.send(connected_frame("Welcome")).await.unwrap();
        next_outbound(&mut ws).await.unwrap();
        for price in [101.0, 102.0, 103.0] {
            ws.send(update_frame("IET", price)).await.unwrap();
        }
        while ws.next().await.is_some() {}
    });

    let mut session = Session::new(session_config(&url, 200));
    assert_ok!(session.start().await);

    let first = drive_until(&mut session, |c| matches!(c, Change::Committed(s) if !s.is_empty())).await;
    assert_eq!(first, Change::Committed(syms(&["IET"])));
    assert_eq!(
        session.controller().state().engine.get("IET").unwrap().current_price,
        dec!(101)
    );

    let trailing = drive_until(&mut session, |c| matches!(c, Change::Committed(s) if !s.is_empty())).await;
    assert_eq!(trailing, Change::Committed(syms(&["IET"])));

    let iet = session.controller().state().engine.get("IET").unwrap();
    assert_eq!(iet.current_price, dec!(103));
    assert!(!iet.history().iter().any(|p| *p == dec!(102)));
    assert_eq!(iet.max_price, dec!(103));
    assert!(session.controller().next_deadline().is_none());

    assert_ok!(session.shutdown().await);
}

/// Against a locally running price simulator
#[tokio::test]
#[ignore = "requires running price simulator"]
async fn test_live_simulator() {
    let mut session = Session::new(SessionConfig::default());
    assert_ok!(session.start().await);

    drive_until(&mut session, |c| matches!(c, Change::Catalog { .. })).await;
    assert!(session.controller().state().catalog.is_populated());

    drive_until(&mut session, |c| matches!(c, Change::Committed(s) if !s.is_empty())).await;
    assert_ok!(session.shutdown().await);
}
