//! CLI interface for algotrader
//!
//! Provides subcommands for:
//! - `ingest`: poll the price source and publish ticks to the bus
//! - `strategy`: consume ticks and publish trading signals
//! - `run`: run both pipeline stages in one process
//! - `config`: show current configuration

mod ingest;
mod run;
mod strategy;

pub use ingest::IngestArgs;
pub use run::RunArgs;
pub use strategy::StrategyArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "algotrader")]
#[command(about = "Event-driven SMA crossover trading signal pipeline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the price source and publish ticks to the bus
    Ingest(IngestArgs),
    /// Consume ticks from the bus and publish trading signals
    Strategy(StrategyArgs),
    /// Run both pipeline stages in-process over an in-memory bus
    Run(RunArgs),
    /// Show current configuration
    Config,
}
