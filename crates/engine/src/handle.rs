// In crates/engine/src/handle.rs

use crate::command::{Command, Input};
use crate::snapshot::EngineSnapshot;
use crate::state::{EngineState, EngineStatus};
use crate::{Error, Result};
use app_config::TradingConfig;
use core_types::{Candle, ClosedTrade, LedgerSnapshot};
use events::EngineEvent;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// The control surface of a running engine.
///
/// Cheap to clone. Mutating calls are queued behind any candles already
/// submitted and resolve once the coordinator has applied them; reads are
/// answered directly from the shared state.
#[derive(Clone)]
pub struct EngineHandle {
    inbox: mpsc::Sender<Input>,
    state: Arc<RwLock<EngineState>>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    pub(crate) fn new(
        inbox: mpsc::Sender<Input>,
        state: Arc<RwLock<EngineState>>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self { inbox, state, events }
    }

    /// Queues a candle for processing. Waits if the queue is full.
    pub async fn submit_candle(&self, candle: Candle) -> Result<()> {
        self.inbox
            .send(Input::Candle(candle))
            .await
            .map_err(|_| Error::ChannelClosed)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.inbox
            .send(Input::Command(make(tx)))
            .await
            .map_err(|_| Error::ChannelClosed)?;
        rx.await.map_err(|_| Error::ChannelClosed)
    }

    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Takes effect after the cycle in progress, if any, has completed.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    pub async fn status(&self) -> EngineStatus {
        self.state.read().await.status()
    }

    pub async fn is_running(&self) -> bool {
        self.state.read().await.running
    }

    pub async fn config(&self) -> TradingConfig {
        self.state.read().await.config.clone()
    }

    /// Validates and applies `config` between cycles.
    pub async fn set_config(&self, config: TradingConfig) -> Result<()> {
        self.request(|tx| Command::SetConfig(Box::new(config), tx)).await?
    }

    /// Closes a position at market with reason `MANUAL`.
    pub async fn close_position(&self, position_id: u64) -> Result<ClosedTrade> {
        self.request(|tx| Command::ClosePosition(position_id, tx)).await?
    }

    pub async fn adjust_total_capital(&self, delta: Decimal) -> Result<LedgerSnapshot> {
        self.request(|tx| Command::AdjustTotalCapital(delta, tx)).await
    }

    /// Overwrites total capital with an externally reported balance.
    pub async fn set_total_capital(&self, total: Decimal) -> Result<LedgerSnapshot> {
        self.request(|tx| Command::SetTotalCapital(total, tx)).await
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::from_book(&self.state.read().await.book)
    }

    /// Replaces the trade book with a validated snapshot.
    pub async fn restore(&self, snapshot: EngineSnapshot) -> Result<()> {
        self.request(|tx| Command::Restore(Box::new(snapshot), tx)).await?
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}
