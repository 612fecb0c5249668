//! Periodic scan scheduler.
//!
//! Runs the first cycle immediately and then one cycle per interval. Cycles
//! never overlap: a cycle that overruns its slot pushes the next run to the
//! following interval boundary and the missed ticks are dropped.

use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::ScannerSettings;
use crate::scanner::Scanner;

pub struct ScanScheduler {
    scanner: Scanner,
    interval: Duration,
    progress_interval: Duration,
}

impl ScanScheduler {
    pub fn new(scanner: Scanner, settings: &ScannerSettings) -> Self {
        Self {
            scanner,
            interval: settings.interval(),
            progress_interval: settings.progress_log_interval(),
        }
    }

    /// Runs scan cycles until cancellation.
    ///
    /// Cancellation is honoured while waiting for the next run. A cycle that
    /// has already started is allowed to finish.
    pub async fn run(mut self, cancellation_token: CancellationToken) -> Result<()> {
        info!("Scan scheduler started (every {}s)", self.interval.as_secs());

        let mut next_run = Instant::now();
        let mut cycle: u64 = 0;

        while self.wait_until(next_run, &cancellation_token).await {
            cycle += 1;
            let started = Instant::now();
            info!("Starting scan cycle #{}", cycle);

            match self.scanner.run_cycle().await {
                Ok(report) => info!(
                    "Scan cycle #{} finished in {:.1}s: {} alert(s)",
                    cycle,
                    started.elapsed().as_secs_f64(),
                    report.alerts.len()
                ),
                Err(e) => error!("Scan cycle #{} failed: {:#}", cycle, e),
            }

            let (next, skipped) = next_deadline(next_run, Instant::now(), self.interval);
            if skipped > 0 {
                warn!(
                    "Scan cycle #{} overran the {}s interval, skipping {} scheduled run(s)",
                    cycle,
                    self.interval.as_secs(),
                    skipped
                );
            }
            next_run = next;
        }

        info!(
            "Scan scheduler: Received cancellation signal, stopped after {} cycle(s)",
            cycle
        );
        Ok(())
    }

    /// Sleeps until `deadline`, logging the countdown. Returns false if cancelled.
    async fn wait_until(&self, deadline: Instant, cancellation_token: &CancellationToken) -> bool {
        let period = self.progress_interval.max(Duration::from_secs(1));
        let mut progress = tokio::time::interval_at(Instant::now() + period, period);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = cancellation_token.cancelled() => return false,
                _ = &mut sleep => return true,
                _ = progress.tick() => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    info!("Next scan in {}", format_countdown(remaining));
                }
            }
        }
    }
}

/// Next run after a cycle that was scheduled at `scheduled` and ended at `now`,
/// plus the number of interval boundaries that already passed.
fn next_deadline(scheduled: Instant, now: Instant, interval: Duration) -> (Instant, u32) {
    if interval.is_zero() {
        return (now, 0);
    }

    let mut next = scheduled + interval;
    let mut skipped = 0;
    while next <= now {
        next += interval;
        skipped += 1;
    }
    (next, skipped)
}

fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}
