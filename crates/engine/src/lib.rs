// In crates/engine/src/lib.rs

mod command;
pub mod coordinator;
pub mod error;
pub mod handle;
pub mod snapshot;
pub mod state;

pub use coordinator::StrategyCoordinator;
pub use error::{Error, Result};
pub use handle::EngineHandle;
pub use snapshot::EngineSnapshot;
pub use state::{AccountSummary, EngineState, EngineStatus};

use crate::command::Input;
use app_config::TradingConfig;
use events::EngineEvent;
use execution::Exchange;
use risk::{CapitalLedger, TradeBook};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

/// Bound on queued candles and commands.
pub const INPUT_QUEUE_CAPACITY: usize = 1024;

/// Capacity of the event channel. Slow subscribers lag rather than block the engine.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// A configured engine that has not been started yet.
pub struct Engine {
    coordinator: StrategyCoordinator,
    inbox: mpsc::Receiver<Input>,
    handle: EngineHandle,
}

impl Engine {
    /// Builds an engine with a fresh ledger holding `initial_capital`.
    ///
    /// The engine begins STOPPED; call [`EngineHandle::start`] to trade.
    pub fn new(
        config: TradingConfig,
        initial_capital: Decimal,
        exchange: Arc<dyn Exchange>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let book = TradeBook::new(CapitalLedger::new(initial_capital, config.risk.cap_amount()));
        Self::with_book(config, book, exchange, events)
    }

    /// Builds an engine that resumes from a persisted snapshot.
    pub fn from_snapshot(
        config: TradingConfig,
        snapshot: EngineSnapshot,
        exchange: Arc<dyn Exchange>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Result<Self> {
        config.validate()?;
        let book = snapshot.into_book(config.risk.max_positions)?;
        Self::with_book(config, book, exchange, events)
    }

    fn with_book(
        config: TradingConfig,
        book: TradeBook,
        exchange: Arc<dyn Exchange>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Result<Self> {
        let (tx, inbox) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        let coordinator_config = config.clone();
        let state = Arc::new(RwLock::new(EngineState::new(book, config)));
        let coordinator = StrategyCoordinator::new(state.clone(), &coordinator_config, exchange, events.clone());
        Ok(Self {
            coordinator,
            inbox,
            handle: EngineHandle::new(tx, state, events),
        })
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Spawns the coordinator onto the tokio runtime.
    ///
    /// The task ends once every [`EngineHandle`] has been dropped.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let Engine {
            coordinator,
            inbox,
            handle,
        } = self;
        let task = tokio::spawn(coordinator.run(inbox));
        (handle, task)
    }
}

/// Creates an event channel of the default capacity.
pub fn event_channel() -> broadcast::Sender<EngineEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}
