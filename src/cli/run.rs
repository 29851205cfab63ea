//! Run command implementation
//!
//! Wires both pipeline stages over an in-memory bus in one process. Useful
//! for local runs without an external relay; the production deployment runs
//! `ingest` and `strategy` as separate processes.

use crate::bus::{InMemoryBus, MessageBus, TRADING_SIGNALS_CHANNEL};
use crate::config::Config;
use crate::feed::BinanceClient;
use crate::ingest::TickScheduler;
use crate::strategy::{Strategy, StrategyRunner};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let bus = Arc::new(InMemoryBus::new());

        let strategy = Strategy::sma_crossover(config.strategy.sma_window)?;
        tracing::info!(strategy = strategy.name(), "Initialized strategy");

        // Subscriptions are established before the scheduler starts so the
        // first published tick is not missed.
        let runner = StrategyRunner::subscribe(bus.clone(), strategy).await?;
        let mut signals = bus.subscribe(TRADING_SIGNALS_CHANNEL).await?;

        let source = BinanceClient::new(Duration::from_secs(config.feed.request_timeout_secs));
        let scheduler = TickScheduler::new(
            source,
            bus.clone(),
            config.feed.symbol.clone(),
            Duration::from_secs(config.feed.poll_interval_secs),
        );

        tokio::spawn(runner.run());
        tokio::spawn(async move {
            while let Some(payload) = signals.recv().await {
                tracing::info!(payload = %payload, "Signal emitted");
            }
        });

        tokio::select! {
            _ = scheduler.run() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down pipeline");
            }
        }

        Ok(())
    }
}
