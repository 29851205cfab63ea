//! Binance REST price source
//!
//! One request to the spot ticker endpoint per scheduled poll.

use super::{PriceSource, Tick};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Binance REST API base URL
pub const BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Response shape of the /ticker/price endpoint
#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

/// HTTP client for the Binance spot ticker
pub struct BinanceClient {
    base_url: String,
    client: Client,
}

impl BinanceClient {
    /// Create a client against the public API with the given request timeout
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url(BINANCE_API_URL, timeout)
    }

    /// Create a client against a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn fetch(&self, symbol: &str) -> anyhow::Result<Tick> {
        let url = format!("{}/ticker/price", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance API error: {} - {}", status, body);
        }

        let ticker: TickerPrice = response.json().await?;
        let price = Decimal::from_str(&ticker.price)?;

        let tick = Tick::new(ticker.symbol, price);
        tracing::debug!(symbol = %tick.symbol, price = %tick.price, "Fetched ticker");
        Ok(tick)
    }
}
