//! Spike classification.
//!
//! Turns one token's drawdown, lifecycle state and 1h trade stats into a
//! [`Classification`]. Rules are evaluated in order and the first match wins:
//!
//! 1. Breakout: back above the drawdown threshold while in cooldown, or
//!    after being monitored as a fallen angel last cycle
//! 2. Not a fallen angel (drawdown unknown or under the threshold)
//! 3. Cooldown active
//! 4. No 1h volume change
//! 5. Volume change under the tier threshold
//! 6. Sell pressure (buy volume not above sell volume)
//! 7. Spike

use std::fmt;

use chrono::{DateTime, Local, Utc};

use crate::db::models::{CooldownStatus, WindowStats};

/// Detection thresholds, all in percent except the market cap ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub min_drawdown_percent: f64,
    pub min_volume_change_percent: f64,
    pub min_volume_change_percent_micro: f64,
    pub micro_cap_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_drawdown_percent: 60.0,
            min_volume_change_percent: 15.0,
            min_volume_change_percent_micro: 50.0,
            micro_cap_threshold: 100_000.0,
        }
    }
}

impl Thresholds {
    pub fn tier(&self, market_cap: f64) -> MarketCapTier {
        if market_cap < self.micro_cap_threshold {
            MarketCapTier::Micro
        } else {
            MarketCapTier::Regular
        }
    }

    pub fn required_volume_change(&self, tier: MarketCapTier) -> f64 {
        match tier {
            MarketCapTier::Micro => self.min_volume_change_percent_micro,
            MarketCapTier::Regular => self.min_volume_change_percent,
        }
    }

    pub fn is_fallen_angel(&self, drawdown: Option<f64>) -> bool {
        drawdown.is_some_and(|d| d >= self.min_drawdown_percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketCapTier {
    Micro,
    Regular,
}

impl fmt::Display for MarketCapTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketCapTier::Micro => write!(f, "micro-cap"),
            MarketCapTier::Regular => write!(f, "regular"),
        }
    }
}

/// Everything the classifier needs to know about one token.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub drawdown: Option<f64>,
    pub cooldown: CooldownStatus,
    /// Drawdown recorded last cycle, if the token was being monitored
    pub previous_drawdown: Option<f64>,
    pub market_cap: f64,
    pub stats_1h: Option<&'a WindowStats>,
}

/// Why a token did not alert this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum NoSpikeReason {
    InsufficientDrawdown {
        drawdown: Option<f64>,
        required: f64,
    },
    CooldownActive {
        until: DateTime<Utc>,
    },
    NoVolumeData,
    VolumeBelowThreshold {
        tier: MarketCapTier,
        volume_change: f64,
        required: f64,
    },
    SellPressure {
        buy_volume: f64,
        sell_volume: f64,
    },
}

impl fmt::Display for NoSpikeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoSpikeReason::InsufficientDrawdown { drawdown: Some(d), required } => {
                write!(f, "Not a fallen angel ({:.2}% down < {}%)", d, required)
            },
            NoSpikeReason::InsufficientDrawdown { drawdown: None, required } => {
                write!(f, "Not a fallen angel (N/A down < {}%)", required)
            },
            NoSpikeReason::CooldownActive { until } => write!(
                f,
                "In cooldown until {}",
                until.with_timezone(&Local).format("%H:%M")
            ),
            NoSpikeReason::NoVolumeData => write!(f, "No volume change data"),
            NoSpikeReason::VolumeBelowThreshold {
                tier,
                volume_change,
                required,
            } => write!(
                f,
                "{} volume change {:.2}% < {}% threshold",
                tier, volume_change, required
            ),
            NoSpikeReason::SellPressure {
                buy_volume,
                sell_volume,
            } => write!(
                f,
                "Sell pressure (buy ${:.2} <= sell ${:.2})",
                buy_volume, sell_volume
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    NoSpike {
        reason: NoSpikeReason,
    },
    Spike {
        stats: WindowStats,
    },
    Breakout {
        previous_drawdown: f64,
        current_drawdown: f64,
        stats: WindowStats,
    },
}

impl Classification {
    pub fn is_alert(&self) -> bool {
        !matches!(self, Classification::NoSpike { .. })
    }
}

pub fn classify(input: &ClassifierInput<'_>, thresholds: &Thresholds) -> Classification {
    let stats = input.stats_1h.cloned().unwrap_or_default();

    if !thresholds.is_fallen_angel(input.drawdown) {
        // Rule 1: a tracked fallen angel climbing back over the threshold
        if let Some(current_drawdown) = input.drawdown {
            let previous_drawdown = match input.cooldown {
                CooldownStatus::Active {
                    drawdown_at_alert, ..
                } => Some(drawdown_at_alert),
                CooldownStatus::Inactive => input
                    .previous_drawdown
                    .filter(|prev| thresholds.is_fallen_angel(Some(*prev))),
            };

            if let Some(previous_drawdown) = previous_drawdown {
                return Classification::Breakout {
                    previous_drawdown,
                    current_drawdown,
                    stats,
                };
            }
        }

        return Classification::NoSpike {
            reason: NoSpikeReason::InsufficientDrawdown {
                drawdown: input.drawdown,
                required: thresholds.min_drawdown_percent,
            },
        };
    }

    if let CooldownStatus::Active { until, .. } = input.cooldown {
        return Classification::NoSpike {
            reason: NoSpikeReason::CooldownActive { until },
        };
    }

    let Some(volume_change) = stats.volume_change else {
        return Classification::NoSpike {
            reason: NoSpikeReason::NoVolumeData,
        };
    };

    let tier = thresholds.tier(input.market_cap);
    let required = thresholds.required_volume_change(tier);
    if volume_change < required {
        return Classification::NoSpike {
            reason: NoSpikeReason::VolumeBelowThreshold {
                tier,
                volume_change,
                required,
            },
        };
    }

    let buy_volume = stats.buy_volume_or_zero();
    let sell_volume = stats.sell_volume_or_zero();
    if buy_volume <= sell_volume {
        return Classification::NoSpike {
            reason: NoSpikeReason::SellPressure {
                buy_volume,
                sell_volume,
            },
        };
    }

    Classification::Spike { stats }
}
