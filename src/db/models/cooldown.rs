use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::next_cooldown_milestone;

/// Alert suppression window opened by a non-breakout spike.
///
/// Primary Key: token_id
/// `cooldown_until` is the next `:00`/`:30` wall-clock milestone after the alert,
/// so it is always in the future when the entry is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub token_id: String,
    pub symbol: String,
    pub last_alert_at: DateTime<Utc>,
    pub cooldown_until: DateTime<Utc>,
    pub drawdown_at_alert: f64,
}

impl CooldownEntry {
    /// Opens a cooldown at `now`, expiring at the next milestone in `now`'s time zone.
    pub fn new<Tz: TimeZone>(
        token_id: &str,
        symbol: &str,
        drawdown_at_alert: f64,
        now: &DateTime<Tz>,
    ) -> Self {
        Self {
            token_id: token_id.to_string(),
            symbol: symbol.to_string(),
            last_alert_at: now.with_timezone(&Utc),
            cooldown_until: next_cooldown_milestone(now).with_timezone(&Utc),
            drawdown_at_alert,
        }
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now < self.cooldown_until
    }
}

/// Result of a cooldown lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CooldownStatus {
    Inactive,
    Active {
        until: DateTime<Utc>,
        drawdown_at_alert: f64,
    },
}

impl CooldownStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, CooldownStatus::Active { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_entry_expires_at_next_half_hour() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 14, 12, 40).unwrap();
        let entry = CooldownEntry::new("mint", "MINT", 72.5, &now);

        assert_eq!(entry.last_alert_at, now);
        assert_eq!(
            entry.cooldown_until,
            Utc.with_ymd_and_hms(2024, 5, 1, 14, 30, 0).unwrap()
        );
        assert_eq!(entry.drawdown_at_alert, 72.5);
    }

    #[test]
    fn test_entry_is_inactive_from_expiry_onwards() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 14, 45, 0).unwrap();
        let entry = CooldownEntry::new("mint", "MINT", 65.0, &now);

        assert!(entry.is_active_at(now));
        assert!(entry.is_active_at(entry.cooldown_until - Duration::seconds(1)));
        assert!(!entry.is_active_at(entry.cooldown_until));
        assert!(!entry.is_active_at(entry.cooldown_until + Duration::minutes(5)));
    }
}
