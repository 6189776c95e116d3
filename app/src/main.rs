// In app/src/main.rs

use anyhow::{Context, Result};
use app_config::Settings;
use clap::{Parser, Subcommand};
use core_types::Candle;
use engine::{Engine, EngineSnapshot};
use events::{EngineEvent, EventKind};
use execution::PaperExchange;
use self::tracing_layer::{EventLogLayer, LogCache};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing_subscriber::prelude::*;

mod tracing_layer;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "An RSI + Bollinger Band single-instrument trading engine.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replays a candle file through the engine against the paper exchange.
    Run {
        /// JSON-lines file, one candle per line. Prices are decimal strings.
        #[arg(short, long)]
        candles: PathBuf,

        /// Resume from a previously written snapshot.
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write the final trade book here.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },

    /// Prints the validated effective configuration.
    Config,

    /// Loads and validates a snapshot, then prints its ledger.
    Status {
        #[arg(short, long)]
        snapshot: PathBuf,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = app_config::load_settings().context("loading configuration")?;

    let events = engine::event_channel();
    let log_cache: LogCache = Arc::new(Mutex::new(VecDeque::with_capacity(tracing_layer::LOG_CACHE_SIZE)));
    init_tracing(&settings, events.clone(), log_cache.clone());

    tracing::info!(environment = %settings.app.environment, "Starting trading engine.");

    match cli.command {
        Commands::Run {
            candles,
            resume,
            snapshot_out,
        } => {
            handle_run(&settings, &candles, resume.as_deref(), snapshot_out.as_deref(), events, log_cache).await?;
        }
        Commands::Config => {
            println!("{}", app_config::to_toml_string(&settings)?);
        }
        Commands::Status { snapshot } => {
            handle_status(&settings, &snapshot)?;
        }
    }

    Ok(())
}

fn init_tracing(settings: &Settings, events: broadcast::Sender<EngineEvent>, cache: LogCache) {
    let level = tracing::Level::from_str(&settings.app.log_level).unwrap_or(tracing::Level::INFO);
    let targets = tracing_subscriber::filter::Targets::new()
        .with_target("operations", tracing::Level::INFO)
        .with_default(level);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(targets.clone());
    let event_layer = EventLogLayer::new(events, cache).with_filter(targets);
    tracing_subscriber::registry().with(fmt_layer).with(event_layer).init();
}

// --- "Run" Subcommand Logic ---

#[derive(Serialize)]
struct RunReport {
    candles_submitted: usize,
    status: engine::EngineStatus,
    recent_warnings: Vec<events::LogLine>,
}

async fn handle_run(
    settings: &Settings,
    candles_path: &Path,
    resume: Option<&Path>,
    snapshot_out: Option<&Path>,
    events: broadcast::Sender<EngineEvent>,
    log_cache: LogCache,
) -> Result<()> {
    let candles = read_candles(candles_path)?;
    tracing::info!(count = candles.len(), path = %candles_path.display(), "Candles loaded.");

    let exchange = Arc::new(PaperExchange::new(&settings.paper));
    let engine = match resume {
        Some(path) => {
            let snapshot = EngineSnapshot::from_json(&std::fs::read_to_string(path)?)?;
            Engine::from_snapshot(settings.trading.clone(), snapshot, exchange, events.clone())?
        }
        None => Engine::new(
            settings.trading.clone(),
            settings.paper.initial_capital_amount(),
            exchange,
            events.clone(),
        )?,
    };

    let reporter = tokio::spawn(report_events(events.subscribe()));
    let (handle, task) = engine.spawn();
    handle.start().await?;

    let submitted = candles.len();
    for candle in candles {
        handle.submit_candle(candle).await?;
    }
    // Queued behind every candle, so it returns once all of them are processed.
    handle.stop().await?;

    let status = handle.status().await;
    if let Some(path) = snapshot_out {
        std::fs::write(path, handle.snapshot().await.to_json()?)
            .with_context(|| format!("writing snapshot to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Snapshot written.");
    }

    drop(handle);
    task.await?;
    reporter.abort();

    let recent_warnings = log_cache
        .lock()
        .map(|cache| {
            cache
                .iter()
                .filter(|line| line.level == "WARN" || line.level == "ERROR")
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let report = RunReport {
        candles_submitted: submitted,
        status,
        recent_warnings,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn read_candles(path: &Path) -> Result<Vec<Candle>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading candles from {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("{}:{}: invalid candle", path.display(), i + 1))
        })
        .collect()
}

/// Logs the engine's trading events. `Log` events are skipped since they
/// originate from the log pipeline itself.
async fn report_events(mut rx: broadcast::Receiver<EngineEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.kind {
                EventKind::Log(_) | EventKind::SignalEvaluated { .. } | EventKind::LedgerUpdated { .. } => {}
                EventKind::PositionOpened { position } => {
                    tracing::info!(position_id = position.id, direction = %position.direction, "Event: position opened.");
                }
                EventKind::PositionClosed { trade, .. } => {
                    tracing::info!(
                        position_id = trade.position_id,
                        reason = %trade.exit_reason,
                        pnl = %trade.pnl,
                        "Event: position closed."
                    );
                }
                other => tracing::debug!(event = other.name(), "Event received."),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event reporter lagged.");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// --- "Status" Subcommand Logic ---

fn handle_status(settings: &Settings, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading snapshot {}", path.display()))?;
    let book = EngineSnapshot::from_json(&json)?.into_book(settings.trading.risk.max_positions)?;

    let summary = serde_json::json!({
        "ledger": book.ledger().snapshot(),
        "open_positions": book.open_positions(),
        "trade_count": book.trade_history().len(),
        "realized_pnl": book.realized_pnl(),
        "next_position_id": book.next_position_id(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
