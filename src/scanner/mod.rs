//! Fallen angel detection.
//!
//! - [`classifier`] - Pure spike/breakout decision procedure
//! - [`ath_cache`] - Historical high cache with refresh policy
//! - [`orchestrator`] - One full scan cycle over the watchlist

pub mod ath_cache;
pub mod classifier;
pub mod orchestrator;

pub use ath_cache::AthCache;
pub use classifier::{
    classify, Classification, ClassifierInput, MarketCapTier, NoSpikeReason, Thresholds,
};
pub use orchestrator::{CycleReport, FetchTarget, Prefilter, Scanner};
