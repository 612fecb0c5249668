//! Market data providers.
//!
//! The scanner only sees the two traits below:
//! - [`PriceQuoteSource`] - live price, market cap and windowed trade stats
//! - [`PriceRangeSource`] - historical high/low over a time range
//!
//! HTTP implementations live in [`jupiter`] and [`solana_tracker`].

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::WindowStats;

pub mod jupiter;
pub mod solana_tracker;

pub use jupiter::JupiterClient;
pub use solana_tracker::SolanaTrackerClient;

/// Live market state of a token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenQuote {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub market_cap: f64,
    pub holder_count: Option<u64>,
    pub organic_score: Option<f64>,
    pub stats_1h: Option<WindowStats>,
    pub stats_6h: Option<WindowStats>,
    pub stats_24h: Option<WindowStats>,
}

/// One extreme of a historical range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub price: f64,
    #[serde(rename = "marketcap", default)]
    pub market_cap: f64,
    /// Unix seconds
    pub time: i64,
}

/// Highest and lowest observation over a requested time range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub highest: PricePoint,
    pub lowest: PricePoint,
}

#[async_trait]
pub trait PriceQuoteSource: Send + Sync {
    /// Full quote, or `None` when the provider does not know the token.
    async fn quote(&self, token_id: &str) -> anyhow::Result<Option<TokenQuote>>;

    /// Current price only. Used by the cheap pre-filter pass.
    async fn price(&self, token_id: &str) -> anyhow::Result<Option<f64>> {
        Ok(self.quote(token_id).await?.map(|quote| quote.price))
    }
}

#[async_trait]
pub trait PriceRangeSource: Send + Sync {
    async fn range(
        &self,
        token_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<PriceRange>;
}

/// Shared HTTP client for the provider implementations.
pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}
