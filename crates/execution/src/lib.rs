// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{CloseRequest, Fill, OrderRequest};

pub mod error;
pub mod paper;
pub mod retry;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use paper::PaperExchange;
pub use retry::retry_with_backoff;
pub use types::{PaperSettings, RetryPolicy};

/// The venue the engine trades on.
///
/// Both calls are remote and fallible. A returned [`Fill`] is the only proof
/// that an order was executed; the engine never commits a state change
/// without one.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// The name of the venue (e.g., "PaperExchange").
    fn name(&self) -> &'static str;

    /// Places a market entry order and returns the confirmed fill.
    async fn place_order(&self, order: &OrderRequest) -> Result<Fill>;

    /// Flattens an open position and returns the confirmed exit fill.
    async fn close_order(&self, close: &CloseRequest) -> Result<Fill>;
}
