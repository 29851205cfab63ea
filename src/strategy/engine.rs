//! Strategy processing loop
//!
//! One runner owns one strategy instance and drains one ordered tick
//! subscription, so window and position state are only ever touched from
//! this loop. Emitted signals are republished to the signals channel.

use super::{Signal, Strategy};
use crate::bus::{MessageBus, MARKET_DATA_CHANNEL, TRADING_SIGNALS_CHANNEL};
use crate::feed::Tick;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Consumes ticks in subscription order and publishes emitted signals
pub struct StrategyRunner<B> {
    bus: Arc<B>,
    strategy: Strategy,
    ticks: mpsc::Receiver<String>,
}

impl<B: MessageBus> StrategyRunner<B> {
    /// Subscribe to the market data channel and build a runner
    ///
    /// The subscription is established before this returns, so ticks
    /// published afterwards are not missed.
    pub async fn subscribe(bus: Arc<B>, strategy: Strategy) -> anyhow::Result<Self> {
        let ticks = bus.subscribe(MARKET_DATA_CHANNEL).await?;
        tracing::info!(
            strategy = strategy.name(),
            input = MARKET_DATA_CHANNEL,
            output = TRADING_SIGNALS_CHANNEL,
            "Strategy subscribed"
        );
        Ok(Self { bus, strategy, ticks })
    }

    /// Drain the subscription until the transport closes it
    pub async fn run(mut self) {
        while let Some(payload) = self.ticks.recv().await {
            self.handle_message(&payload).await;
        }
        tracing::info!("Market data subscription closed, strategy loop exiting");
    }

    async fn handle_message(&mut self, payload: &str) {
        let tick: Tick = match serde_json::from_str(payload) {
            Ok(tick) => tick,
            Err(e) => {
                tracing::error!(error = %e, "Discarding undecodable tick payload");
                return;
            }
        };
        tracing::debug!(symbol = %tick.symbol, price = %tick.price, "Received tick");

        if let Some(signal) = self.strategy.process(&tick) {
            self.publish_signal(&signal).await;
        }
    }

    /// Publish an emitted signal
    ///
    /// Strategy state has already advanced and is not rolled back; a failed
    /// publish only loses the signal.
    async fn publish_signal(&self, signal: &Signal) {
        let payload = match serde_json::to_string(signal) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode signal, signal lost");
                return;
            }
        };

        match self.bus.publish(TRADING_SIGNALS_CHANNEL, payload).await {
            Ok(receivers) => {
                tracing::info!(
                    signal = ?signal.signal_type,
                    symbol = %signal.symbol,
                    price = %signal.price,
                    receivers,
                    "Published signal"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Signal publish failed, signal lost");
            }
        }
    }
}
