// In crates/engine/src/state.rs

use app_config::TradingConfig;
use core_types::{IndicatorSnapshot, LedgerSnapshot, Position};
use risk::TradeBook;
use rust_decimal::Decimal;
use serde::Serialize;

/// State shared between the coordinator task (sole writer) and handles (readers).
///
/// Writers hold the lock only for synchronous commits, never across an
/// exchange call, so readers always observe fully-applied state.
#[derive(Debug)]
pub struct EngineState {
    pub(crate) book: TradeBook,
    pub(crate) running: bool,
    pub(crate) config: TradingConfig,
    pub(crate) last_candle_time: Option<i64>,
    pub(crate) last_indicators: Option<IndicatorSnapshot>,
}

impl EngineState {
    pub(crate) fn new(book: TradeBook, config: TradingConfig) -> Self {
        Self {
            book,
            running: false,
            config,
            last_candle_time: None,
            last_indicators: None,
        }
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            running: self.running,
            ledger: self.book.ledger().snapshot(),
            open_positions: self.book.open_positions().to_vec(),
            summary: AccountSummary {
                open_position_count: self.book.open_count(),
                trade_count: self.book.trade_history().len(),
                realized_pnl: self.book.realized_pnl(),
                last_candle_time: self.last_candle_time,
                last_indicators: self.last_indicators,
            },
        }
    }
}

/// Answer to `getStatus`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub ledger: LedgerSnapshot,
    pub open_positions: Vec<Position>,
    pub summary: AccountSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSummary {
    pub open_position_count: usize,
    pub trade_count: usize,
    pub realized_pnl: Decimal,
    pub last_candle_time: Option<i64>,
    pub last_indicators: Option<IndicatorSnapshot>,
}
