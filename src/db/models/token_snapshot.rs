use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade statistics for one rolling window (1h, 6h or 24h).
///
/// Every field is optional: the quote provider omits fields freely,
/// and a missing value must never be read as zero activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowStats {
    pub price_change: Option<f64>,
    pub holder_change: Option<f64>,
    pub volume_change: Option<f64>,
    pub buy_volume: Option<f64>,
    pub sell_volume: Option<f64>,
    pub num_buys: Option<u64>,
    pub num_sells: Option<u64>,
    pub num_traders: Option<u64>,
    pub num_organic_buyers: Option<u64>,
    pub num_net_buyers: Option<i64>,
}

impl WindowStats {
    /// Buy volume, with a missing value counted as no buying.
    pub fn buy_volume_or_zero(&self) -> f64 {
        self.buy_volume.unwrap_or(0.0)
    }

    /// Sell volume, with a missing value counted as no selling.
    pub fn sell_volume_or_zero(&self) -> f64 {
        self.sell_volume.unwrap_or(0.0)
    }
}

/// One token's market state as observed during a single scan cycle.
///
/// Population: built once per detailed fetch, never mutated afterwards.
///
/// Persisted to:
///   - token history (all snapshots of a cycle, keyed by cycle timestamp)
///   - latest snapshot (overwritten every cycle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    // Identity
    pub id: String,
    pub name: String,
    pub symbol: String,

    // Market data
    pub market_cap: f64,
    pub current_price: f64,
    pub holder_count: Option<u64>,
    pub organic_score: Option<f64>,

    // ATH baseline
    pub ath_price: Option<f64>,
    pub ath_market_cap: Option<f64>,
    pub drawdown_percent: Option<f64>,

    // Windowed stats
    pub stats_1h: Option<WindowStats>,
    pub stats_6h: Option<WindowStats>,
    pub stats_24h: Option<WindowStats>,

    pub fetched_at: DateTime<Utc>,
}

impl TokenSnapshot {
    /// Whether the token sits below the given market cap ceiling.
    pub fn is_micro_cap(&self, micro_cap_threshold: f64) -> bool {
        self.market_cap < micro_cap_threshold
    }
}
