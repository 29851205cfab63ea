//! Strategy domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Direction of a trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    Hold,
}

/// A directional trading recommendation emitted on a crossover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal direction
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    /// Trading symbol the signal applies to
    pub symbol: String,
    /// Price at which the signal was generated
    pub price: Decimal,
    /// Name of the strategy that produced the signal
    pub strategy: String,
    /// When the signal was generated
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    /// Create a signal stamped at the current instant
    pub fn new(
        signal_type: SignalType,
        symbol: impl Into<String>,
        price: Decimal,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            signal_type,
            symbol: symbol.into(),
            price,
            strategy: strategy.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Where the last processed price sat relative to the indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// No baseline established yet
    Unknown,
    Above,
    Below,
}

/// Strategy construction errors
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("SMA window must be > 0, got: {0}")]
    InvalidWindow(usize),
}
