//! Tick ingestion scheduling
//!
//! Polls the upstream price source on a fixed period and republishes each
//! observation to the market data channel.

use crate::bus::{MessageBus, MARKET_DATA_CHANNEL};
use crate::feed::PriceSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Fixed-period fetch/publish loop
///
/// Holds no state besides period and symbol. A failed cycle is logged and
/// skipped; the next poll happens at the scheduled period regardless, so a
/// transient fetch error is retried implicitly on the next tick.
pub struct TickScheduler<S, B> {
    source: S,
    bus: Arc<B>,
    symbol: String,
    period: Duration,
}

impl<S: PriceSource, B: MessageBus> TickScheduler<S, B> {
    /// Create a scheduler polling `symbol` every `period`
    pub fn new(source: S, bus: Arc<B>, symbol: impl Into<String>, period: Duration) -> Self {
        Self {
            source,
            bus,
            symbol: symbol.into(),
            period,
        }
    }

    /// Run the fetch/publish cycle until the task is cancelled
    ///
    /// The first poll fires immediately.
    pub async fn run(&self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = self.cycle().await {
                tracing::error!(symbol = %self.symbol, error = %e, "Tick fetch/publish cycle failed");
            }
        }
    }

    async fn cycle(&self) -> anyhow::Result<()> {
        let tick = self.source.fetch(&self.symbol).await?;
        let payload = serde_json::to_string(&tick)?;
        let receivers = self.bus.publish(MARKET_DATA_CHANNEL, payload).await?;
        tracing::info!(symbol = %tick.symbol, price = %tick.price, receivers, "Published tick");
        Ok(())
    }
}
