//! Half-hour wall-clock milestones for alert cooldowns.

use chrono::{DateTime, Duration, TimeZone, Timelike};

/// Next `:00` or `:30` boundary strictly after `now`, in `now`'s time zone.
///
/// - minute 0..=29  → `:30:00` of the current hour
/// - minute 30..=59 → `:00:00` of the next hour
pub fn next_cooldown_milestone<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let minute = now.minute();
    let top_of_hour = now.clone()
        - Duration::minutes(i64::from(minute))
        - Duration::seconds(i64::from(now.second()))
        - Duration::nanoseconds(i64::from(now.nanosecond()));

    if minute < 30 {
        top_of_hour + Duration::minutes(30)
    } else {
        top_of_hour + Duration::hours(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_first_half_rounds_to_half_past() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(
            next_cooldown_milestone(&now),
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 29, 59).unwrap();
        assert_eq!(
            next_cooldown_milestone(&now),
            Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_second_half_rounds_to_next_hour() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap();
        assert_eq!(
            next_cooldown_milestone(&now),
            Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        assert_eq!(
            next_cooldown_milestone(&now),
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_subsecond_precision_is_dropped() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 9, 15, 0).unwrap()
            + Duration::milliseconds(750);
        let milestone = next_cooldown_milestone(&now);

        assert_eq!(milestone.nanosecond(), 0);
        assert_eq!(milestone.minute(), 30);
    }

    #[test]
    fn test_milestone_is_future_and_aligned() {
        let start = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

        // Every 7 seconds across two hours covers all minute/second combinations we care about
        for step in 0..(2 * 3600 / 7) {
            let now = start + Duration::seconds(step * 7);
            let milestone = next_cooldown_milestone(&now);

            assert!(milestone > now, "{milestone} not after {now}");
            assert!(milestone - now <= Duration::minutes(30));
            assert!(milestone.minute() == 0 || milestone.minute() == 30);
            assert_eq!(milestone.second(), 0);
        }
    }

    #[test]
    fn test_uses_local_wall_clock_of_offset() {
        // 09:40 at UTC+05:30 is 04:10 UTC; the local rule applies (next local hour)
        let tz = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let now = tz.with_ymd_and_hms(2024, 3, 10, 9, 40, 0).unwrap();
        let milestone = next_cooldown_milestone(&now);

        assert_eq!(milestone, tz.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap());
        assert_eq!(
            milestone.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 3, 10, 4, 30, 0).unwrap()
        );
    }
}
