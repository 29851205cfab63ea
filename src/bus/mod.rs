//! Message bus transport
//!
//! The pipeline relies on two transport primitives: publish a payload to a
//! named channel, and subscribe to a channel as an ordered stream. Delivery
//! is at-most-once: late subscribers never see earlier messages and nothing
//! is queued or replayed.

mod memory;
mod remote;

pub use memory::InMemoryBus;
pub use remote::{RemoteBus, RemoteBusConfig};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel carrying serialized ticks
pub const MARKET_DATA_CHANNEL: &str = "market_data";

/// Channel carrying serialized signals
pub const TRADING_SIGNALS_CHANNEL: &str = "trading_signals";

/// Pub/sub transport contract
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a payload to a channel, returning how many currently-connected
    /// subscribers were notified. Subscribers that connect later never
    /// receive this message.
    async fn publish(&self, channel: &str, payload: String) -> anyhow::Result<u64>;

    /// Subscribe to a channel. Messages arrive in publish order for the
    /// lifetime of the subscription; nothing published earlier is replayed.
    async fn subscribe(&self, channel: &str) -> anyhow::Result<mpsc::Receiver<String>>;

    /// Whether the transport currently considers itself reachable
    fn is_connected(&self) -> bool;
}

/// Bus transport errors
#[derive(Debug, Error)]
pub enum BusError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("frame encoding failed: {0}")]
    Codec(String),
}
