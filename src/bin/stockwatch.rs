//! Terminal front end: prints live metrics and reads commands from stdin.
//!
//! Commands: `add SYM`, `remove SYM`, `throttle MS`, `list`, `quit`.

use std::time::Duration;

use stockwatch::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level. Logs go to stderr so
/// stdout carries only the price display.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

enum Wake {
    Change(Option<Change>),
    Line(std::io::Result<Option<String>>),
    Interrupt,
}

enum Flow {
    Continue,
    Quit,
}

#[tokio::main]
async fn main() -> StockwatchResult<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = SessionConfig::from_env()?;
    tracing::info!(
        url = %config.websocket.url,
        throttle_ms = config.throttle.as_millis() as u64,
        "stockwatch starting"
    );

    let mut session = Session::new(config);
    session.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_removal: Option<Symbol> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let wake = tokio::select! {
            change = session.next_change() => Wake::Change(change),
            line = lines.next_line() => Wake::Line(line),
            _ = &mut ctrl_c => Wake::Interrupt,
        };

        match wake {
            Wake::Change(Some(change)) => render(&session, &change),
            Wake::Change(None) => break,
            Wake::Line(Ok(Some(line))) => {
                if let Flow::Quit = handle_line(&mut session, line.trim(), &mut pending_removal) {
                    break;
                }
            }
            Wake::Line(Ok(None)) => break,
            Wake::Line(Err(e)) => {
                tracing::warn!("Failed to read stdin: {}", e);
                break;
            }
            Wake::Interrupt => break,
        }
    }

    session.shutdown().await?;
    Ok(())
}

fn handle_line(session: &mut Session, line: &str, pending_removal: &mut Option<Symbol>) -> Flow {
    // Answer to a pending "remove?" prompt
    if let Some(symbol) = pending_removal.take() {
        if matches!(line.to_ascii_lowercase().as_str(), "y" | "yes") {
            session.dispatch(Command::RemoveSubscription(symbol.clone()));
            println!("Removed {}", symbol);
        } else {
            println!("Kept {}", symbol);
        }
        return Flow::Continue;
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let arg = parts.next();

    match (verb, arg) {
        ("", _) => {}
        ("add", Some(sym)) => {
            let symbol = Symbol::from(sym.to_ascii_uppercase());
            let available = session
                .controller()
                .available_to_add()
                .iter()
                .any(|s| s.symbol == symbol);
            let populated = session.controller().state().catalog.is_populated();
            if populated && !available {
                println!("{} is unknown or already subscribed", symbol);
            } else {
                session.dispatch(Command::AddSubscription(symbol.clone()));
                println!("Subscribed to {}", symbol);
                print_table(session);
            }
        }
        ("add", None) => print_available(session),
        ("remove", Some(sym)) => {
            let symbol = Symbol::from(sym.to_ascii_uppercase());
            if session.controller().state().subscriptions.contains(symbol.as_str()) {
                println!("Remove {}? [y/N]", symbol);
                *pending_removal = Some(symbol);
            } else {
                println!("Not subscribed to {}", symbol);
            }
        }
        ("throttle", Some(ms)) => match ms.parse::<u64>() {
            Ok(ms) => {
                session.dispatch(Command::SetThrottle(Duration::from_millis(ms)));
                println!("Throttle set to {} ms", ms);
            }
            Err(_) => println!("Throttle must be a whole number of milliseconds"),
        },
        ("list", _) => {
            print_table(session);
            print_available(session);
        }
        ("quit" | "exit", _) => return Flow::Quit,
        _ => println!("Commands: add SYM | remove SYM | throttle MS | list | quit"),
    }
    Flow::Continue
}

fn render(session: &Session, change: &Change) {
    match change {
        Change::Connection(ConnectionState::Connecting) => {
            println!("Connecting to {} ...", session.url());
        }
        Change::Connection(ConnectionState::Connected) => {
            println!("Connected to {}", session.url());
        }
        Change::Connection(ConnectionState::Error) => {
            println!(
                "Unable to reach the stock feed at {}; retrying every {} ms",
                session.url(),
                RECONNECT_INTERVAL_MS
            );
        }
        Change::Catalog { message } => {
            println!("{}", message);
            print_table(session);
        }
        Change::Committed(symbols) => {
            for view in session.controller().visible() {
                if symbols.contains(&view.stock.symbol) {
                    println!("{}", format_row(&view));
                }
            }
        }
        Change::Disconnected { reason } => println!("Connection lost: {}", reason),
        Change::Ignored => {}
    }
}

/// Metrics line followed by the price history chart and catch phrase.
fn format_row(view: &StockView<'_>) -> String {
    let m = view.metrics;
    format!(
        "{:<6} {:<28} {:>10}  base {:>10}  {:>8}  min {:>10}  max {:>10}\n       {}  {}",
        view.stock.symbol,
        view.stock.company_name,
        format_price(m.current_price),
        format_price(m.base_price),
        format_percentage(m.change_percentage),
        format_price(m.min_price),
        format_price(m.max_price),
        format_sparkline(m.history().iter().copied()),
        view.stock.catch_phrase,
    )
}

fn print_table(session: &Session) {
    let visible = session.controller().visible();
    if visible.is_empty() {
        println!("No stocks subscribed. Use `add SYM`.");
        return;
    }
    for view in &visible {
        println!("{}", format_row(view));
    }
}

fn print_available(session: &Session) {
    let available = session.controller().available_to_add();
    if available.is_empty() {
        println!("All stocks are subscribed");
        return;
    }
    println!("Available:");
    for stock in available {
        println!("  {:<6} {}  {}", stock.symbol, stock.company_name, stock.catch_phrase);
    }
}
