// In crates/engine/src/command.rs

use crate::snapshot::EngineSnapshot;
use crate::Result;
use app_config::TradingConfig;
use core_types::{Candle, ClosedTrade, LedgerSnapshot};
use rust_decimal::Decimal;
use tokio::sync::oneshot;

/// Everything the coordinator consumes, on one queue.
#[derive(Debug)]
pub(crate) enum Input {
    Candle(Candle),
    Command(Command),
}

/// Control requests. Each carries the channel its answer goes back on.
#[derive(Debug)]
pub(crate) enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    SetConfig(Box<TradingConfig>, oneshot::Sender<Result<()>>),
    ClosePosition(u64, oneshot::Sender<Result<ClosedTrade>>),
    AdjustTotalCapital(Decimal, oneshot::Sender<LedgerSnapshot>),
    SetTotalCapital(Decimal, oneshot::Sender<LedgerSnapshot>),
    Restore(Box<EngineSnapshot>, oneshot::Sender<Result<()>>),
}
