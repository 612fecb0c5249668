//! Utility functions for the scanner.
//!
//! This module is organized into focused submodules:
//!
//! - [`drawdown`] - Drawdown percentage from a cached ATH
//! - [`milestone`] - Half-hour wall-clock milestones for cooldown expiry
//! - [`retry`] - Retry policy shared by the provider clients

mod drawdown;
mod milestone;
mod retry;

// ============================================
// Re-exports
// ============================================

pub use drawdown::{drawdown_from_ath, drawdown_percent};
pub use milestone::next_cooldown_milestone;
pub use retry::{Backoff, RetryPolicy};

/// Sleeps for `delay`, returning immediately for a zero delay.
pub async fn pause(delay: std::time::Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Shortened token id for progress logs (`AbCdEfGh...`).
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
