//! Strategy engine module
//!
//! Consumes ticks from the market data channel, maintains per-symbol
//! indicator state, and emits directional signals on crossovers.

mod engine;
mod sma;
mod types;

pub use engine::StrategyRunner;
pub use sma::SmaCrossover;
pub use types::{Position, Signal, SignalType, StrategyError};

use crate::feed::Tick;

/// Available strategy kinds
///
/// One variant per strategy; adding a strategy means adding a variant and
/// its dispatch arms.
pub enum Strategy {
    SmaCrossover(SmaCrossover),
}

impl Strategy {
    /// Construct an SMA crossover strategy with the given window size
    pub fn sma_crossover(window_size: usize) -> Result<Self, StrategyError> {
        Ok(Self::SmaCrossover(SmaCrossover::new(window_size)?))
    }

    /// Process a tick, optionally producing a signal
    pub fn process(&mut self, tick: &Tick) -> Option<Signal> {
        match self {
            Self::SmaCrossover(strategy) => strategy.process(tick),
        }
    }

    /// Human-readable strategy name
    pub fn name(&self) -> &str {
        match self {
            Self::SmaCrossover(strategy) => strategy.name(),
        }
    }
}
