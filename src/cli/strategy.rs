//! Strategy command implementation

use crate::bus::{MessageBus, RemoteBus, RemoteBusConfig};
use crate::config::Config;
use crate::health;
use crate::strategy::{Strategy, StrategyRunner};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct StrategyArgs {}

impl StrategyArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let strategy = Strategy::sma_crossover(config.strategy.sma_window)?;
        tracing::info!(
            strategy = strategy.name(),
            window = config.strategy.sma_window,
            "Initialized strategy"
        );

        let bus = Arc::new(RemoteBus::connect(RemoteBusConfig::new(&config.bus.url)).await?);
        let runner = StrategyRunner::subscribe(bus.clone(), strategy).await?;

        let listener =
            tokio::net::TcpListener::bind(("0.0.0.0", config.health.strategy_port)).await?;
        let health_bus: Arc<dyn MessageBus> = bus.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(listener, "strategy-engine", health_bus).await {
                tracing::error!(error = %e, "Health endpoint stopped");
            }
        });

        tokio::select! {
            _ = runner.run() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down strategy engine");
            }
        }

        Ok(())
    }
}
