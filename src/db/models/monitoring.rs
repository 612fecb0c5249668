use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A token currently tracked as a fallen angel.
///
/// Primary Key: token_id
/// Exists only between the cycle that first sees the token at or past the
/// drawdown threshold and the cycle where it recovers or breaks out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringEntry {
    pub token_id: String,
    pub symbol: String,
    pub last_drawdown_percent: f64,
    pub last_seen_at: DateTime<Utc>,
}

impl MonitoringEntry {
    pub fn new(token_id: &str, symbol: &str, last_drawdown_percent: f64) -> Self {
        Self {
            token_id: token_id.to_string(),
            symbol: symbol.to_string(),
            last_drawdown_percent,
            last_seen_at: Utc::now(),
        }
    }
}
