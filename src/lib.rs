//! algotrader: event-driven trading signal pipeline
//!
//! This library provides the core components for:
//! - Polling spot prices from the Binance REST API
//! - Publishing normalized ticks over a pub/sub message bus
//! - SMA crossover strategy over a bounded price window
//! - Signal publishing for downstream consumers
//! - Health reporting and structured logging

pub mod bus;
pub mod cli;
pub mod config;
pub mod feed;
pub mod health;
pub mod ingest;
pub mod strategy;
pub mod telemetry;
