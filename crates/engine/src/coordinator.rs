// In crates/engine/src/coordinator.rs

use crate::command::{Command, Input};
use crate::snapshot::EngineSnapshot;
use crate::state::EngineState;
use crate::{Error, Result};
use app_config::TradingConfig;
use core_types::{
    Candle, CloseRequest, ClosedTrade, ExitReason, IndicatorSnapshot, LedgerSnapshot, PositionStatus, Signal,
};
use events::{EngineEvent, EventKind};
use execution::{retry_with_backoff, Exchange, RetryPolicy};
use risk::{ExitTrigger, PositionManager, RiskMonitor};
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use strategies::{IndicatorEngine, SignalEvaluator};
use tokio::sync::{broadcast, mpsc, RwLock};

/// Drives one instrument: owns the candle window and runs one cycle per
/// finalized candle.
///
/// The coordinator is the only writer of [`EngineState`]. Candles and
/// control commands arrive on a single queue and are handled strictly in
/// order, so a command never lands in the middle of a cycle.
pub struct StrategyCoordinator {
    state: Arc<RwLock<EngineState>>,
    exchange: Arc<dyn Exchange>,
    events: broadcast::Sender<EngineEvent>,
    // The in-memory "hot" cache of recent candles
    window: VecDeque<Candle>,
    history_size: usize,
    indicators: IndicatorEngine,
    evaluator: SignalEvaluator,
    positions: PositionManager,
    monitor: RiskMonitor,
    retry: RetryPolicy,
    /// Exits whose close order failed; retried on the next cycle.
    pending_exits: HashMap<u64, ExitTrigger>,
}

impl StrategyCoordinator {
    pub(crate) fn new(
        state: Arc<RwLock<EngineState>>,
        config: &TradingConfig,
        exchange: Arc<dyn Exchange>,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            state,
            exchange,
            events,
            window: VecDeque::with_capacity(config.strategy.lookback().min(config.history_size) + 1),
            history_size: config.history_size,
            indicators: IndicatorEngine::new(&config.strategy),
            evaluator: SignalEvaluator::new(config.strategy.clone()),
            positions: PositionManager::new(config.risk.clone()),
            monitor: RiskMonitor::new(&config.risk),
            retry: config.retry.clone(),
            pending_exits: HashMap::new(),
        }
    }

    /// The main, long-running loop. Returns once every handle is dropped.
    pub(crate) async fn run(mut self, mut inbox: mpsc::Receiver<Input>) {
        tracing::info!(
            exchange = self.exchange.name(),
            strategy = self.evaluator.name(),
            "Starting strategy coordinator."
        );
        while let Some(input) = inbox.recv().await {
            match input {
                Input::Candle(candle) => self.on_candle(candle).await,
                Input::Command(command) => self.on_command(command).await,
            }
        }
        tracing::info!("Input queue closed. Strategy coordinator stopped.");
    }

    fn emit(&self, kind: EventKind) {
        // No subscribers is not an error.
        let _ = self.events.send(EngineEvent::now(kind));
    }

    fn emit_ledger(&self, ledger: LedgerSnapshot) {
        self.emit(EventKind::LedgerUpdated { ledger });
    }

    // --- Cycle ---

    async fn on_candle(&mut self, candle: Candle) {
        if !candle.is_closed {
            tracing::trace!(open_time = candle.open_time, "Ignoring in-progress candle.");
            return;
        }

        let running = {
            let mut state = self.state.write().await;
            if let Some(last) = state.last_candle_time {
                if candle.open_time <= last {
                    tracing::warn!(
                        open_time = candle.open_time,
                        last_open_time = last,
                        "Ignoring duplicate or out-of-order candle."
                    );
                    return;
                }
            }
            self.window.push_back(candle.clone());
            while self.window.len() > self.history_size {
                self.window.pop_front();
            }
            let snapshot = self.compute_indicators();
            state.last_candle_time = Some(candle.open_time);
            state.last_indicators = snapshot;
            state.running
        };

        if !running {
            return;
        }

        let open_at_start = self.state.read().await.book.open_count();
        let mut closed_this_cycle = false;
        if open_at_start > 0 || !self.pending_exits.is_empty() {
            closed_this_cycle = self.risk_phase(&candle).await;
        }

        let (open_now, snapshot) = {
            let state = self.state.read().await;
            (state.book.open_count(), state.last_indicators)
        };
        let slot_available = open_now < self.positions.settings().max_positions;
        if !closed_this_cycle && slot_available {
            self.signal_phase(&candle, snapshot, slot_available).await;
        }
    }

    fn compute_indicators(&self) -> Option<IndicatorSnapshot> {
        let (front, back) = self.window.as_slices();
        let snapshot = if back.is_empty() {
            self.indicators.compute(front)
        } else {
            let window: Vec<Candle> = self.window.iter().cloned().collect();
            self.indicators.compute(&window)
        };
        match snapshot {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!(error = %e, "Indicators not ready.");
                None
            }
        }
    }

    /// Retries pending exits, then runs the exit rules for every other open
    /// position. Returns `true` if any position was closed.
    async fn risk_phase(&mut self, candle: &Candle) -> bool {
        let mut exits: Vec<ExitTrigger> = self.pending_exits.values().copied().collect();
        exits.sort_by_key(|t| t.position_id);

        let triggers = {
            let pending = &self.pending_exits;
            let mut state = self.state.write().await;
            self.monitor.check_book(&mut state.book, candle, |id| pending.contains_key(&id))
        };
        exits.extend(triggers);

        let mut closed_any = false;
        for trigger in exits {
            match self.execute_close(trigger, candle.open_time).await {
                Ok(Some(_)) => closed_any = true,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(position_id = trigger.position_id, error = %e, "Exit could not be applied.");
                }
            }
        }
        closed_any
    }

    async fn signal_phase(&mut self, candle: &Candle, snapshot: Option<IndicatorSnapshot>, slot_available: bool) {
        let signal = self.evaluator.evaluate(candle, snapshot.as_ref(), slot_available);
        tracing::debug!(direction = ?signal.direction, rationale = %signal.rationale, "Signal evaluated.");
        self.emit(EventKind::SignalEvaluated {
            signal: signal.clone(),
            snapshot,
        });

        if signal.is_entry() {
            tracing::info!(
                direction = ?signal.direction,
                price = %signal.trigger_price,
                rationale = %signal.rationale,
                "Strategy generated a signal."
            );
            self.execute_open(&signal, candle.open_time).await;
        }
    }

    // --- Order flow ---

    async fn execute_open(&mut self, signal: &Signal, opened_at: i64) {
        let plan = {
            let state = self.state.read().await;
            self.positions.plan_open(&state.book, signal)
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "Entry rejected by risk rules.");
                self.emit(EventKind::ActionRejected { reason: e.to_string() });
                return;
            }
        };

        let order = plan.order_request();
        let exchange = Arc::clone(&self.exchange);
        let placed = retry_with_backoff(&self.retry, "place_order", || exchange.place_order(&order)).await;
        let fill = match placed {
            Ok(fill) => fill,
            Err(e) => {
                // Nothing was reserved yet, so there is nothing to roll back.
                tracing::error!(direction = %plan.direction, error = %e, "Order placement failed.");
                self.emit(EventKind::OpenFailed {
                    direction: plan.direction,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let committed = {
            let mut state = self.state.write().await;
            self.positions
                .open(&mut state.book, &plan, fill, opened_at)
                .map(|position| (position, state.book.ledger().snapshot()))
        };
        match committed {
            Ok((position, ledger)) => {
                self.emit(EventKind::PositionOpened { position });
                self.emit_ledger(ledger);
            }
            Err(e) => {
                tracing::error!(error = %e, "Order filled but the position could not be recorded.");
                self.emit(EventKind::OpenFailed {
                    direction: plan.direction,
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Closes one position through the exchange.
    ///
    /// Returns `Ok(None)` if the close order failed; the exit is then kept
    /// and retried on the next cycle while the position stays OPEN.
    async fn execute_close(&mut self, trigger: ExitTrigger, closed_at: i64) -> Result<Option<ClosedTrade>> {
        let Some(request) = self.close_request(trigger.position_id, trigger.reference_price).await else {
            self.pending_exits.remove(&trigger.position_id);
            return Err(self.stale_close_error(trigger.position_id).await);
        };

        let exchange = Arc::clone(&self.exchange);
        let closed = retry_with_backoff(&self.retry, "close_order", || exchange.close_order(&request)).await;
        let fill = match closed {
            Ok(fill) => fill,
            Err(e) => {
                tracing::error!(
                    position_id = trigger.position_id,
                    reason = %trigger.reason,
                    error = %e,
                    "Close order failed; position stays open and will be retried."
                );
                self.pending_exits.insert(trigger.position_id, trigger);
                self.emit(EventKind::CloseFailed {
                    position_id: trigger.position_id,
                    reason: e.to_string(),
                });
                return Ok(None);
            }
        };

        self.commit_close(trigger.position_id, fill.price, trigger.reason, closed_at)
            .await
            .map(Some)
    }

    async fn close_request(&self, position_id: u64, reference_price: Decimal) -> Option<CloseRequest> {
        let state = self.state.read().await;
        state.book.position(position_id).map(|position| CloseRequest {
            position_id,
            direction: position.direction,
            size: position.size,
            reference_price,
        })
    }

    /// Books a confirmed exit fill.
    async fn commit_close(
        &mut self,
        position_id: u64,
        exit_price: Decimal,
        reason: ExitReason,
        closed_at: i64,
    ) -> Result<ClosedTrade> {
        let committed = {
            let mut state = self.state.write().await;
            self.positions
                .close(&mut state.book, position_id, exit_price, reason, closed_at)
                .map(|(position, trade)| (position, trade, state.book.ledger().snapshot()))
        };
        self.pending_exits.remove(&position_id);
        let (position, trade, ledger) = committed.map_err(|e| self.invariant_violation(position_id, e))?;
        self.emit(EventKind::PositionClosed {
            position,
            trade: trade.clone(),
        });
        self.emit_ledger(ledger);
        Ok(trade)
    }

    /// The error for a close aimed at a position that is not open.
    async fn stale_close_error(&self, position_id: u64) -> Error {
        let already_closed = self
            .state
            .read()
            .await
            .book
            .trade_history()
            .iter()
            .any(|t| t.position_id == position_id);
        if already_closed {
            let e = risk::Error::InvalidStateTransition {
                position_id,
                from: PositionStatus::Closed,
                to: PositionStatus::Closed,
            };
            return self.invariant_violation(position_id, e);
        }
        risk::Error::PositionNotFound(position_id).into()
    }

    fn invariant_violation(&self, position_id: u64, e: risk::Error) -> Error {
        if matches!(e, risk::Error::InvalidStateTransition { .. }) {
            tracing::error!(position_id, error = %e, "Invalid position state transition.");
            self.emit(EventKind::InvariantViolation {
                position_id,
                reason: e.to_string(),
            });
        } else {
            tracing::error!(position_id, error = %e, "Position close could not be applied.");
        }
        e.into()
    }

    // --- Control ---

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                self.set_running(true).await;
                let _ = reply.send(());
            }
            Command::Stop(reply) => {
                self.set_running(false).await;
                let _ = reply.send(());
            }
            Command::SetConfig(config, reply) => {
                let _ = reply.send(self.apply_config(*config).await);
            }
            Command::ClosePosition(position_id, reply) => {
                let _ = reply.send(self.close_manually(position_id).await);
            }
            Command::AdjustTotalCapital(delta, reply) => {
                let ledger = {
                    let mut state = self.state.write().await;
                    state.book.adjust_total_capital(delta);
                    state.book.ledger().snapshot()
                };
                tracing::info!(%delta, total = %ledger.total_capital, "Total capital adjusted.");
                self.emit_ledger(ledger);
                let _ = reply.send(ledger);
            }
            Command::SetTotalCapital(total, reply) => {
                let ledger = {
                    let mut state = self.state.write().await;
                    state.book.set_total_capital(total);
                    state.book.ledger().snapshot()
                };
                tracing::info!(total = %ledger.total_capital, "Total capital synchronized.");
                self.emit_ledger(ledger);
                let _ = reply.send(ledger);
            }
            Command::Restore(snapshot, reply) => {
                let _ = reply.send(self.restore(*snapshot).await);
            }
        }
    }

    async fn set_running(&mut self, running: bool) {
        let changed = {
            let mut state = self.state.write().await;
            let changed = state.running != running;
            state.running = running;
            changed
        };
        if changed {
            tracing::info!(running, "Engine state changed.");
            self.emit(EventKind::StateChanged { running });
        }
    }

    async fn apply_config(&mut self, config: TradingConfig) -> Result<()> {
        config.validate()?;

        self.indicators = IndicatorEngine::new(&config.strategy);
        self.evaluator = SignalEvaluator::new(config.strategy.clone());
        self.positions.update_settings(config.risk.clone());
        self.monitor = RiskMonitor::new(&config.risk);
        self.retry = config.retry.clone();
        self.history_size = config.history_size;
        while self.window.len() > self.history_size {
            self.window.pop_front();
        }

        let ledger = {
            let mut state = self.state.write().await;
            state.book.set_cap(config.risk.cap_amount());
            state.config = config;
            state.book.ledger().snapshot()
        };
        tracing::info!(cap = %ledger.cap, "Configuration updated.");
        self.emit_ledger(ledger);
        Ok(())
    }

    async fn close_manually(&mut self, position_id: u64) -> Result<ClosedTrade> {
        // Manual closes reference the latest close, falling back to the entry price.
        let last_close = self.window.back().map(|c| c.close);
        let reference_price = {
            let state = self.state.read().await;
            state.book.position(position_id).map(|p| last_close.unwrap_or(p.entry_price))
        };
        let Some(request) = self.close_request(position_id, reference_price.unwrap_or_default()).await else {
            return Err(self.stale_close_error(position_id).await);
        };

        tracing::info!(position_id, price = %request.reference_price, "Manual close requested.");
        let exchange = Arc::clone(&self.exchange);
        let fill = match retry_with_backoff(&self.retry, "close_order", || exchange.close_order(&request)).await {
            Ok(fill) => fill,
            Err(e) => {
                self.emit(EventKind::CloseFailed {
                    position_id,
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let closed_at = self.window.back().map(|c| c.open_time).unwrap_or_default();
        self.commit_close(position_id, fill.price, ExitReason::Manual, closed_at).await
    }

    async fn restore(&mut self, snapshot: EngineSnapshot) -> Result<()> {
        let book = snapshot.into_book(self.positions.settings().max_positions)?;
        let ledger = {
            let mut state = self.state.write().await;
            state.book = book;
            state.book.ledger().snapshot()
        };
        self.pending_exits.clear();
        tracing::info!(
            reserved = %ledger.reserved_capital,
            available = %ledger.available_capital,
            "Trade book restored from snapshot."
        );
        self.emit_ledger(ledger);
        Ok(())
    }
}
