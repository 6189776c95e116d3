// In crates/execution/src/paper.rs

use crate::types::PaperSettings;
use crate::{Error, Exchange, Result};
use async_trait::async_trait;
use core_types::{CloseRequest, Direction, Fill, OrderRequest};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// A simulated venue that fills every order at its reference price, moved
/// against the trader by the configured slippage.
///
/// `fail_next` makes the following calls fail with a transient error, which
/// lets dry runs and tests exercise the retry and rollback paths.
#[derive(Debug)]
pub struct PaperExchange {
    slippage: Decimal,
    pending_failures: AtomicU32,
    fills: AtomicU64,
}

impl PaperExchange {
    pub fn new(settings: &PaperSettings) -> Self {
        Self {
            slippage: settings.slippage_fraction(),
            pending_failures: AtomicU32::new(0),
            fills: AtomicU64::new(0),
        }
    }

    /// Makes the next `calls` exchange calls fail.
    pub fn fail_next(&self, calls: u32) {
        self.pending_failures.store(calls, Ordering::SeqCst);
    }

    /// Number of orders filled so far.
    pub fn fill_count(&self) -> u64 {
        self.fills.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Buying fills higher, selling fills lower.
    fn slipped(&self, price: Decimal, buying: bool) -> Decimal {
        if buying {
            price * (Decimal::ONE + self.slippage)
        } else {
            price * (Decimal::ONE - self.slippage)
        }
    }

    fn fill(&self, reference_price: Decimal, size: Decimal, buying: bool) -> Result<Fill> {
        if self.take_failure() {
            return Err(Error::Transient {
                reason: "simulated exchange outage".to_string(),
            });
        }
        if reference_price <= Decimal::ZERO {
            return Err(Error::Rejected {
                reason: format!("invalid reference price {reference_price}"),
            });
        }
        if size <= Decimal::ZERO {
            return Err(Error::Rejected {
                reason: format!("invalid order size {size}"),
            });
        }
        self.fills.fetch_add(1, Ordering::SeqCst);
        Ok(Fill {
            price: self.slipped(reference_price, buying),
            size,
        })
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    fn name(&self) -> &'static str {
        "PaperExchange"
    }

    async fn place_order(&self, order: &OrderRequest) -> Result<Fill> {
        let fill = self.fill(order.reference_price, order.size, order.direction == Direction::Long)?;
        tracing::debug!(
            direction = %order.direction,
            size = %fill.size,
            price = %fill.price,
            leverage = order.leverage,
            "Paper order filled."
        );
        Ok(fill)
    }

    async fn close_order(&self, close: &CloseRequest) -> Result<Fill> {
        // Closing a long sells; closing a short buys back.
        let fill = self.fill(close.reference_price, close.size, close.direction == Direction::Short)?;
        tracing::debug!(
            position_id = close.position_id,
            size = %fill.size,
            price = %fill.price,
            "Paper close filled."
        );
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(direction: Direction) -> OrderRequest {
        OrderRequest {
            direction,
            size: dec!(0.2),
            leverage: 5,
            reference_price: dec!(50000),
        }
    }

    fn exchange(slippage_percent: f64) -> PaperExchange {
        PaperExchange::new(&PaperSettings {
            slippage_percent,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn fills_at_reference_without_slippage() {
        let ex = exchange(0.0);
        let fill = ex.place_order(&order(Direction::Long)).await.unwrap();
        assert_eq!(fill.price, dec!(50000));
        assert_eq!(fill.size, dec!(0.2));
        assert_eq!(ex.fill_count(), 1);
    }

    #[tokio::test]
    async fn slippage_always_hurts() {
        let ex = exchange(0.1);
        assert_eq!(ex.place_order(&order(Direction::Long)).await.unwrap().price, dec!(50050));
        assert_eq!(ex.place_order(&order(Direction::Short)).await.unwrap().price, dec!(49950));

        let close = CloseRequest {
            position_id: 1,
            direction: Direction::Long,
            size: dec!(0.2),
            reference_price: dec!(50000),
        };
        assert_eq!(ex.close_order(&close).await.unwrap().price, dec!(49950));
    }

    #[tokio::test]
    async fn injected_failures_are_transient_and_run_out() {
        let ex = exchange(0.0);
        ex.fail_next(2);
        for _ in 0..2 {
            let err = ex.place_order(&order(Direction::Long)).await.unwrap_err();
            assert!(err.is_retryable());
        }
        assert!(ex.place_order(&order(Direction::Long)).await.is_ok());
    }

    #[tokio::test]
    async fn zero_size_is_rejected() {
        let ex = exchange(0.0);
        let mut bad = order(Direction::Long);
        bad.size = Decimal::ZERO;
        let err = ex.place_order(&bad).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
