use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::PriceRange;

/// Historical high/low for a token over a fixed lookback window.
///
/// Primary Key: token_id
/// Invariant: `ath_price > 0` for every stored record; ranges that would
/// violate it are rejected by [`AthRecord::from_range`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthRecord {
    pub token_id: String,

    pub ath_price: f64,
    pub ath_market_cap: f64,
    pub ath_time: DateTime<Utc>,

    pub atl_price: f64,
    pub atl_market_cap: f64,
    pub atl_time: DateTime<Utc>,

    pub last_updated: DateTime<Utc>,
    pub window_days: u32,
}

impl AthRecord {
    /// Builds a record from a provider range, or `None` if the high is unusable.
    pub fn from_range(
        token_id: &str,
        range: &PriceRange,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let ath_price = range.highest.price;
        if !(ath_price.is_finite() && ath_price > 0.0) {
            return None;
        }

        Some(Self {
            token_id: token_id.to_string(),
            ath_price,
            ath_market_cap: range.highest.market_cap,
            ath_time: unix_to_utc(range.highest.time),
            atl_price: range.lowest.price,
            atl_market_cap: range.lowest.market_cap,
            atl_time: unix_to_utc(range.lowest.time),
            last_updated: now,
            window_days,
        })
    }

    /// True when `current_price` exceeds the recorded high by more than `margin`
    /// (0.05 = 5%). Small overshoots are provider lag, not a new high.
    pub fn is_exceeded_by(&self, current_price: f64, margin: f64) -> bool {
        current_price > self.ath_price * (1.0 + margin)
    }
}

fn unix_to_utc(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}
