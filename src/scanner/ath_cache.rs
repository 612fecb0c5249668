use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{info, warn};

use crate::db::models::AthRecord;
use crate::db::AthStore;
use crate::providers::PriceRangeSource;
use crate::utils::{pause, short_id, RetryPolicy};

/// Per-token historical high cache backed by the range provider.
///
/// A record is fetched on first sight of a token and re-fetched only when the
/// live price runs past the cached high by more than `refresh_margin`. Fetch
/// failures fall back to the stale record when one exists.
pub struct AthCache {
    store: AthStore,
    ranges: Arc<dyn PriceRangeSource>,
    retry: RetryPolicy,
    window_days: u32,
    refresh_margin: f64,
    range_pause: Duration,
}

impl AthCache {
    pub fn new(
        store: AthStore,
        ranges: Arc<dyn PriceRangeSource>,
        retry: RetryPolicy,
        window_days: u32,
        refresh_margin: f64,
        range_pause: Duration,
    ) -> Self {
        Self {
            store,
            ranges,
            retry,
            window_days,
            refresh_margin,
            range_pause,
        }
    }

    /// Cached record without any provider call. Used by the pre-filter.
    pub fn cached(&self, token_id: &str) -> Option<&AthRecord> {
        self.store.get(token_id)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Resolves the ATH record for `token_id` given its live price.
    pub async fn get(&mut self, token_id: &str, current_price: f64) -> Option<AthRecord> {
        let stale = match self.store.get(token_id) {
            Some(record) if !record.is_exceeded_by(current_price, self.refresh_margin) => {
                return Some(record.clone());
            },
            Some(record) => {
                info!(
                    "[{}] New high ${} above cached ATH ${}, refreshing",
                    short_id(token_id),
                    current_price,
                    record.ath_price
                );
                Some(record.clone())
            },
            None => None,
        };

        match self.fetch(token_id).await {
            Ok(record) => {
                info!(
                    "[{}] ATH ${} ({}d window)",
                    short_id(token_id),
                    record.ath_price,
                    record.window_days
                );
                self.store.upsert(token_id, record.clone());
                Some(record)
            },
            Err(e) => match stale {
                Some(record) => {
                    warn!(
                        "[{}] ATH refresh failed, keeping cached ${}: {:#}",
                        short_id(token_id),
                        record.ath_price,
                        e
                    );
                    Some(record)
                },
                None => {
                    warn!("[{}] No ATH data available: {:#}", short_id(token_id), e);
                    None
                },
            },
        }
    }

    async fn fetch(&self, token_id: &str) -> Result<AthRecord> {
        let to = Utc::now();
        let from = to - chrono::Duration::days(i64::from(self.window_days));
        let label = format!("ATH fetch for {}", short_id(token_id));

        self.retry
            .run(&label, |_| async move {
                let range = self.ranges.range(token_id, from, to).await;
                pause(self.range_pause).await;

                AthRecord::from_range(token_id, &range?, self.window_days, Utc::now())
                    .ok_or_else(|| anyhow!("range has no usable high price"))
            })
            .await
    }
}
