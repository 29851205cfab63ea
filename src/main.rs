use algotrader::cli::{Cli, Commands};
use algotrader::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal; the pipeline must not start
    // partially configured.
    let config = Config::load(&cli.config)
        .map_err(|e| anyhow::anyhow!("Could not load config from {}: {}", cli.config, e))?;

    algotrader::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Ingest(args) => {
            tracing::info!("Starting market ingestor");
            args.execute(&config).await?;
        }
        Commands::Strategy(args) => {
            tracing::info!("Starting strategy engine");
            args.execute(&config).await?;
        }
        Commands::Run(args) => {
            tracing::info!("Starting single-process pipeline");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!("  Bus: {}", config.bus.url);
            println!(
                "  Feed: {} {} every {}s",
                config.feed.exchange, config.feed.symbol, config.feed.poll_interval_secs
            );
            println!("  Strategy: SMA-{}", config.strategy.sma_window);
            println!(
                "  Health: ingest :{}, strategy :{}",
                config.health.ingest_port, config.health.strategy_port
            );
        }
    }

    Ok(())
}
