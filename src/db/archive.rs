use std::collections::BTreeMap;

use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::db::models::{Alert, TokenSnapshot};
use crate::db::storage::Storage;

/// Every cycle's snapshot set, keyed by the cycle's ISO-8601 timestamp.
pub type TokenHistory = BTreeMap<String, Vec<TokenSnapshot>>;

/// Snapshot set of the most recent cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub timestamp: String,
    pub tokens: Vec<TokenSnapshot>,
}

/// Append-only outputs of the scan cycles: token history, latest snapshot, alert log.
///
/// Unlike the keyed stores nothing is cached in memory; each write loads
/// the current document, appends, and saves it back.
pub struct SnapshotArchive {
    history: Box<dyn Storage<TokenHistory>>,
    latest: Box<dyn Storage<LatestSnapshot>>,
    alerts: Box<dyn Storage<Vec<Alert>>>,
}

impl SnapshotArchive {
    pub fn new(
        history: Box<dyn Storage<TokenHistory>>,
        latest: Box<dyn Storage<LatestSnapshot>>,
        alerts: Box<dyn Storage<Vec<Alert>>>,
    ) -> Self {
        Self {
            history,
            latest,
            alerts,
        }
    }

    /// Appends the cycle to history and overwrites the latest snapshot.
    pub fn record_cycle(&self, timestamp: &str, tokens: &[TokenSnapshot]) {
        let saved = self.history.load().and_then(|mut history| {
            history.insert(timestamp.to_string(), tokens.to_vec());
            self.history.save(&history)
        });
        match saved {
            Ok(()) => info!(
                "Saved {} token snapshot(s) to {} at {}",
                tokens.len(),
                self.history.describe(),
                timestamp
            ),
            Err(e) => error!("Failed to append token history: {:#}", e),
        }

        let latest = LatestSnapshot {
            timestamp: timestamp.to_string(),
            tokens: tokens.to_vec(),
        };
        match self.latest.save(&latest) {
            Ok(()) => info!("Latest snapshot saved to {}", self.latest.describe()),
            Err(e) => error!("Failed to save latest snapshot: {:#}", e),
        }
    }

    pub fn append_alerts(&self, alerts: &[Alert]) {
        if alerts.is_empty() {
            return;
        }

        let saved = self.alerts.load().and_then(|mut log| {
            log.extend_from_slice(alerts);
            self.alerts.save(&log)
        });
        match saved {
            Ok(()) => info!(
                "Saved {} alert(s) to {}",
                alerts.len(),
                self.alerts.describe()
            ),
            Err(e) => error!("Failed to append alerts: {:#}", e),
        }
    }

    pub fn history(&self) -> anyhow::Result<TokenHistory> {
        self.history.load()
    }

    pub fn latest(&self) -> anyhow::Result<LatestSnapshot> {
        self.latest.load()
    }

    pub fn alerts(&self) -> anyhow::Result<Vec<Alert>> {
        self.alerts.load()
    }
}
