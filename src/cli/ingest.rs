//! Ingest command implementation

use crate::bus::{MessageBus, RemoteBus, RemoteBusConfig};
use crate::config::Config;
use crate::feed::BinanceClient;
use crate::health;
use crate::ingest::TickScheduler;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Override the configured symbol to poll
    #[arg(long)]
    pub symbol: Option<String>,
}

impl IngestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let symbol = self
            .symbol
            .clone()
            .unwrap_or_else(|| config.feed.symbol.clone());

        let bus = Arc::new(RemoteBus::connect(RemoteBusConfig::new(&config.bus.url)).await?);

        let source = BinanceClient::new(Duration::from_secs(config.feed.request_timeout_secs));
        let scheduler = TickScheduler::new(
            source,
            bus.clone(),
            symbol,
            Duration::from_secs(config.feed.poll_interval_secs),
        );

        let listener =
            tokio::net::TcpListener::bind(("0.0.0.0", config.health.ingest_port)).await?;
        let health_bus: Arc<dyn MessageBus> = bus.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(listener, "market-ingestor", health_bus).await {
                tracing::error!(error = %e, "Health endpoint stopped");
            }
        });

        tokio::select! {
            _ = scheduler.run() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down market ingestor");
            }
        }

        Ok(())
    }
}
