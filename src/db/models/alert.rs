use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{TokenSnapshot, WindowStats};

/// Token fields captured at alert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertToken {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub market_cap: f64,
    pub current_price: f64,
    pub drawdown_percent: Option<f64>,
    pub ath_price: Option<f64>,
    pub holder_count: Option<u64>,
    pub organic_score: Option<f64>,
}

impl From<&TokenSnapshot> for AlertToken {
    fn from(snapshot: &TokenSnapshot) -> Self {
        Self {
            id: snapshot.id.clone(),
            name: snapshot.name.clone(),
            symbol: snapshot.symbol.clone(),
            market_cap: snapshot.market_cap,
            current_price: snapshot.current_price,
            drawdown_percent: snapshot.drawdown_percent,
            ath_price: snapshot.ath_price,
            holder_count: snapshot.holder_count,
            organic_score: snapshot.organic_score,
        }
    }
}

/// 1h trade activity that triggered the alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpikeStats {
    pub volume_change: Option<f64>,
    pub price_change_1h: Option<f64>,
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub num_buys: Option<u64>,
    pub num_sells: Option<u64>,
    pub num_traders: Option<u64>,
    pub num_net_buyers: Option<i64>,
}

impl From<&WindowStats> for SpikeStats {
    fn from(stats: &WindowStats) -> Self {
        Self {
            volume_change: stats.volume_change,
            price_change_1h: stats.price_change,
            buy_volume: stats.buy_volume_or_zero(),
            sell_volume: stats.sell_volume_or_zero(),
            num_buys: stats.num_buys,
            num_sells: stats.num_sells,
            num_traders: stats.num_traders,
            num_net_buyers: stats.num_net_buyers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakoutInfo {
    pub previous_drawdown: f64,
    pub current_drawdown: f64,
}

/// Append-only alert log entry. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub timestamp: DateTime<Utc>,
    pub is_breakout: bool,
    pub is_micro_cap: bool,
    pub token: AlertToken,
    pub spike: SpikeStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakout: Option<BreakoutInfo>,
}
