//! One scan cycle over the watchlist.
//!
//! A cycle runs in stages:
//! 1. Load the watchlist and prune state for tokens that left it
//! 2. Pre-filter: a price-only lookup against the cached ATH
//! 3. Build the fetch set (confirmed, monitored, cooldown, then new tokens)
//! 4. Fetch full quotes and resolve ATH records
//! 5. Classify each kept snapshot and apply the lifecycle side effects
//! 6. Persist alerts, history and the latest snapshot

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat, Utc};
use log::{debug, info, warn};
use rustc_hash::FxHashSet;

use super::ath_cache::AthCache;
use super::classifier::{classify, Classification, ClassifierInput, Thresholds};
use crate::config::ScannerSettings;
use crate::db::models::{
    Alert, AlertToken, BreakoutInfo, CooldownEntry, MonitoringEntry, SpikeStats, TokenSnapshot,
};
use crate::db::{CooldownStore, MonitoringStore, SnapshotArchive, Stores};
use crate::notify::{AlertKind, Notifier};
use crate::providers::{PriceQuoteSource, PriceRangeSource, TokenQuote};
use crate::utils::{drawdown_from_ath, drawdown_percent, pause, short_id};
use crate::watchlist::WatchlistSource;

/// Outcome of the price-only pass over the watchlist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prefilter {
    /// Cached ATH and drawdown at or past the threshold
    pub confirmed: Vec<String>,
    /// No cached ATH yet
    pub new: Vec<String>,
    /// Not a fallen angel, or the price lookup failed
    pub skipped: Vec<String>,
}

/// A token selected for the detailed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub token_id: String,
    /// Reached only through the "no cached ATH" route
    pub is_new: bool,
}

/// Summary of one completed cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub timestamp: String,
    pub watchlist: usize,
    pub pruned: usize,
    pub confirmed: usize,
    pub new: usize,
    pub skipped: usize,
    pub fetched: usize,
    pub failed: usize,
    pub kept: usize,
    pub alerts: Vec<Alert>,
}

impl CycleReport {
    pub fn breakouts(&self) -> usize {
        self.alerts.iter().filter(|alert| alert.is_breakout).count()
    }

    pub fn spikes(&self) -> usize {
        self.alerts.len() - self.breakouts()
    }
}

/// Drives scan cycles over the watchlist.
///
/// Owns all mutable state; the scheduler holds it exclusively, so two cycles
/// can never interleave.
pub struct Scanner {
    settings: ScannerSettings,
    thresholds: Thresholds,
    watchlist: Box<dyn WatchlistSource>,
    quotes: Arc<dyn PriceQuoteSource>,
    ath: AthCache,
    monitoring: MonitoringStore,
    cooldowns: CooldownStore,
    archive: SnapshotArchive,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Scanner {
    pub fn new(
        settings: ScannerSettings,
        stores: Stores,
        watchlist: Box<dyn WatchlistSource>,
        quotes: Arc<dyn PriceQuoteSource>,
        ranges: Arc<dyn PriceRangeSource>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        let Stores {
            ath,
            monitoring,
            cooldowns,
            archive,
        } = stores;

        let ath = AthCache::new(
            ath,
            ranges,
            settings.ath_retry(),
            settings.ath_window_days,
            settings.ath_refresh_margin,
            settings.range_pause(),
        );

        Self {
            thresholds: settings.thresholds(),
            settings,
            watchlist,
            quotes,
            ath,
            monitoring,
            cooldowns,
            archive,
            notifier,
        }
    }

    pub fn monitoring(&self) -> &MonitoringStore {
        &self.monitoring
    }

    pub fn cooldowns(&self) -> &CooldownStore {
        &self.cooldowns
    }

    pub fn ath_cache(&self) -> &AthCache {
        &self.ath
    }

    pub fn archive(&self) -> &SnapshotArchive {
        &self.archive
    }

    /// Runs one full cycle.
    ///
    /// Only an unreadable watchlist fails the cycle. Per-token fetch failures
    /// skip the token; persistence failures are logged by the stores.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let watchlist = self.watchlist.load().context("Failed to load watchlist")?;

        let mut report = CycleReport {
            timestamp,
            watchlist: watchlist.len(),
            ..CycleReport::default()
        };

        if watchlist.is_empty() {
            warn!("Watchlist is empty, nothing to scan");
            return Ok(report);
        }
        info!("Scanning {} watchlist token(s)", watchlist.len());

        report.pruned = self.prune(&watchlist);

        let prefilter = self.prefilter(&watchlist).await;
        report.confirmed = prefilter.confirmed.len();
        report.new = prefilter.new.len();
        report.skipped = prefilter.skipped.len();
        info!(
            "Pre-filter: {} confirmed fallen angel(s), {} new, {} skipped",
            report.confirmed, report.new, report.skipped
        );

        let targets = self.fetch_set(&watchlist, &prefilter);
        info!("Fetching detailed data for {} token(s)", targets.len());

        let mut snapshots = Vec::with_capacity(targets.len());
        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                pause(self.settings.token_delay()).await;
            }

            match self.fetch_snapshot(&target.token_id).await {
                Ok(Some(snapshot)) => {
                    report.fetched += 1;
                    if target.is_new && !self.thresholds.is_fallen_angel(snapshot.drawdown_percent)
                    {
                        debug!(
                            "[{}] New token is not a fallen angel, discarded",
                            short_id(&target.token_id)
                        );
                        continue;
                    }
                    snapshots.push(snapshot);
                },
                Ok(None) => {
                    report.failed += 1;
                    warn!("[{}] Token not found", short_id(&target.token_id));
                },
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        "[{}] Skipping token this cycle: {:#}",
                        short_id(&target.token_id),
                        e
                    );
                },
            }
        }
        report.kept = snapshots.len();

        for snapshot in &snapshots {
            if let Some(alert) = self.evaluate(snapshot).await {
                report.alerts.push(alert);
            }
        }

        self.archive.append_alerts(&report.alerts);
        if snapshots.is_empty() {
            info!("No token data this cycle, keeping the previous snapshot");
        } else {
            self.archive.record_cycle(&report.timestamp, &snapshots);
        }

        info!(
            "Cycle complete: {} kept, {} spike(s), {} breakout(s), {} monitored, {} in cooldown",
            report.kept,
            report.spikes(),
            report.breakouts(),
            self.monitoring.len(),
            self.cooldowns.len()
        );

        Ok(report)
    }

    /// Drops monitoring and cooldown rows for tokens off the watchlist, plus
    /// cooldowns that already elapsed. Returns the number of removed rows.
    fn prune(&mut self, watchlist: &[String]) -> usize {
        let keep: FxHashSet<String> = watchlist.iter().cloned().collect();

        let monitoring = self.monitoring.prune_except(&keep);
        let cooldowns = self.cooldowns.prune_except(&keep);
        let expired = self.cooldowns.prune_expired(Utc::now());

        for token_id in monitoring.iter().chain(&cooldowns) {
            debug!("[{}] Removed from watchlist, state pruned", short_id(token_id));
        }

        monitoring.len() + cooldowns.len() + expired.len()
    }

    /// Splits the watchlist by cached drawdown using price-only lookups.
    ///
    /// Makes no state changes, so identical inputs give identical output.
    pub async fn prefilter(&self, watchlist: &[String]) -> Prefilter {
        let mut result = Prefilter::default();
        let retry = self.settings.quote_retry();
        let quotes = &self.quotes;
        let mut lookups = 0;

        for token_id in watchlist {
            let Some(ath_price) = self.ath.cached(token_id).map(|record| record.ath_price) else {
                result.new.push(token_id.clone());
                continue;
            };

            if lookups > 0 {
                pause(self.settings.prefilter_delay()).await;
            }
            lookups += 1;

            let label = format!("Price lookup for {}", short_id(token_id));
            let price = retry.run(&label, |_| quotes.price(token_id)).await;

            match price {
                Ok(Some(price)) => {
                    let drawdown = drawdown_percent(price, ath_price);
                    if self.thresholds.is_fallen_angel(drawdown) {
                        debug!(
                            "[{}] Confirmed at {:.2}% down",
                            short_id(token_id),
                            drawdown.unwrap_or_default()
                        );
                        result.confirmed.push(token_id.clone());
                    } else {
                        result.skipped.push(token_id.clone());
                    }
                },
                Ok(None) => {
                    debug!("[{}] No price available", short_id(token_id));
                    result.skipped.push(token_id.clone());
                },
                Err(e) => {
                    warn!("[{}] Price lookup failed: {:#}", short_id(token_id), e);
                    result.skipped.push(token_id.clone());
                },
            }
        }

        result
    }

    /// Confirmed, monitored and cooldown tokens first, then new tokens.
    /// A token already reached by another route is not treated as new.
    pub fn fetch_set(&self, watchlist: &[String], prefilter: &Prefilter) -> Vec<FetchTarget> {
        let on_watchlist: FxHashSet<&str> = watchlist.iter().map(String::as_str).collect();
        let mut seen = FxHashSet::default();
        let mut targets = Vec::new();

        let tracked = prefilter
            .confirmed
            .iter()
            .chain(self.monitoring.ids())
            .chain(self.cooldowns.ids())
            .filter(|id| on_watchlist.contains(id.as_str()));

        for token_id in tracked {
            if seen.insert(token_id.as_str()) {
                targets.push(FetchTarget {
                    token_id: token_id.clone(),
                    is_new: false,
                });
            }
        }

        for token_id in &prefilter.new {
            if seen.insert(token_id.as_str()) {
                targets.push(FetchTarget {
                    token_id: token_id.clone(),
                    is_new: true,
                });
            }
        }

        targets
    }

    async fn fetch_snapshot(&mut self, token_id: &str) -> Result<Option<TokenSnapshot>> {
        let label = format!("Quote for {}", short_id(token_id));
        let quotes = &self.quotes;
        let quote = self
            .settings
            .quote_retry()
            .run(&label, |_| quotes.quote(token_id))
            .await?;

        let Some(quote) = quote else {
            return Ok(None);
        };

        let ath = self.ath.get(token_id, quote.price).await;
        let drawdown = drawdown_from_ath(quote.price, ath.as_ref());

        info!(
            "[{}] {} ${} | mcap ${:.0} | {}",
            short_id(token_id),
            quote.symbol,
            quote.price,
            quote.market_cap,
            match drawdown {
                Some(d) => format!("{:.2}% from ATH", d),
                None => "no ATH".to_string(),
            }
        );

        Ok(Some(snapshot_from_quote(
            quote,
            ath.as_ref().map(|r| (r.ath_price, r.ath_market_cap)),
            drawdown,
        )))
    }

    /// Classifies one snapshot, applies the lifecycle side effects and
    /// returns the alert if one fired.
    async fn evaluate(&mut self, snapshot: &TokenSnapshot) -> Option<Alert> {
        let token_id = snapshot.id.as_str();
        let input = ClassifierInput {
            drawdown: snapshot.drawdown_percent,
            cooldown: self.cooldowns.is_active(token_id, Utc::now()),
            previous_drawdown: self.monitoring.last_drawdown(token_id),
            market_cap: snapshot.market_cap,
            stats_1h: snapshot.stats_1h.as_ref(),
        };

        let (kind, stats, breakout) = match classify(&input, &self.thresholds) {
            Classification::NoSpike { reason } => {
                debug!("[{}] No spike: {}", short_id(token_id), reason);
                match snapshot.drawdown_percent {
                    Some(drawdown) if self.thresholds.is_fallen_angel(Some(drawdown)) => {
                        self.monitoring.upsert(
                            token_id,
                            MonitoringEntry::new(token_id, &snapshot.symbol, drawdown),
                        );
                    },
                    _ => {
                        if self.monitoring.remove(token_id).is_some() {
                            info!(
                                "[{}] Recovered above threshold, no longer monitored",
                                short_id(token_id)
                            );
                        }
                    },
                }
                return None;
            },
            Classification::Spike { stats } => {
                if let Some(drawdown) = snapshot.drawdown_percent {
                    let entry =
                        CooldownEntry::new(token_id, &snapshot.symbol, drawdown, &Local::now());
                    debug!(
                        "[{}] Cooldown until {}",
                        short_id(token_id),
                        entry.cooldown_until.with_timezone(&Local).format("%H:%M")
                    );
                    self.cooldowns.upsert(token_id, entry);
                }
                (AlertKind::Spike, stats, None)
            },
            Classification::Breakout {
                previous_drawdown,
                current_drawdown,
                stats,
            } => {
                self.cooldowns.remove(token_id);
                self.monitoring.remove(token_id);
                let info = BreakoutInfo {
                    previous_drawdown,
                    current_drawdown,
                };
                (AlertKind::Breakout, stats, Some(info))
            },
        };

        let alert = Alert {
            timestamp: Utc::now(),
            is_breakout: breakout.is_some(),
            is_micro_cap: snapshot.is_micro_cap(self.thresholds.micro_cap_threshold),
            token: AlertToken::from(snapshot),
            spike: SpikeStats::from(&stats),
            breakout,
        };
        log_alert(&alert);

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(kind).await {
                warn!("Failed to play {} notification: {:#}", kind, e);
            }
        }

        Some(alert)
    }
}

fn snapshot_from_quote(
    quote: TokenQuote,
    ath: Option<(f64, f64)>,
    drawdown_percent: Option<f64>,
) -> TokenSnapshot {
    TokenSnapshot {
        id: quote.id,
        name: quote.name,
        symbol: quote.symbol,
        market_cap: quote.market_cap,
        current_price: quote.price,
        holder_count: quote.holder_count,
        organic_score: quote.organic_score,
        ath_price: ath.map(|(price, _)| price),
        ath_market_cap: ath.map(|(_, market_cap)| market_cap),
        drawdown_percent,
        stats_1h: quote.stats_1h,
        stats_6h: quote.stats_6h,
        stats_24h: quote.stats_24h,
        fetched_at: Utc::now(),
    }
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>, suffix: &str) -> String {
    value
        .map(|v| format!("{}{}", v, suffix))
        .unwrap_or_else(|| "N/A".to_string())
}

fn log_alert(alert: &Alert) {
    let token = &alert.token;
    let spike = &alert.spike;

    let banner = match &alert.breakout {
        Some(b) => format!(
            "BREAKOUT: {:.2}% -> {:.2}% down from ATH",
            b.previous_drawdown, b.current_drawdown
        ),
        None => "VOLUME SPIKE on fallen angel".to_string(),
    };

    info!(
        "\n==================== ALERT ====================\n\
         {}{}\n\
         Token:      {} ({})\n\
         Address:    {}\n\
         Price:      ${}\n\
         Market cap: ${:.0}\n\
         Drawdown:   {}\n\
         Holders:    {}\n\
         Organic:    {}\n\
         1h volume:  {} | price {}\n\
         1h flow:    buy ${:.2} / sell ${:.2} | {} buys, {} sells, {} traders, {} net buyers\n\
         ===============================================",
        banner,
        if alert.is_micro_cap { " [MICRO-CAP]" } else { "" },
        token.name,
        token.symbol,
        token.id,
        token.current_price,
        token.market_cap,
        fmt_opt(token.drawdown_percent.map(|d| format!("{:.2}", d)), "%"),
        fmt_opt(token.holder_count, ""),
        fmt_opt(token.organic_score.map(|s| format!("{:.1}", s)), ""),
        fmt_opt(spike.volume_change.map(|v| format!("{:+.2}", v)), "%"),
        fmt_opt(spike.price_change_1h.map(|v| format!("{:+.2}", v)), "%"),
        spike.buy_volume,
        spike.sell_volume,
        fmt_opt(spike.num_buys, ""),
        fmt_opt(spike.num_sells, ""),
        fmt_opt(spike.num_traders, ""),
        fmt_opt(spike.num_net_buyers, ""),
    );
}
