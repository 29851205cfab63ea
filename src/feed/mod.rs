//! Price feed module
//!
//! Provides spot prices from the Binance REST API

mod binance;
mod types;

pub use binance::{BinanceClient, BINANCE_API_URL};
pub use types::Tick;

use async_trait::async_trait;

/// Trait for price source implementations
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the current price for a symbol; may fail transiently
    async fn fetch(&self, symbol: &str) -> anyhow::Result<Tick>;
}
