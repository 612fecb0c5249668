//! Drawdown from all-time-high.

use crate::db::models::AthRecord;

/// Percentage decline of `current_price` from `ath_price`.
///
/// `None` when the ATH is not a positive finite number; callers treat that
/// as missing data, never as zero drawdown. A price above the ATH yields a
/// negative drawdown.
#[inline]
pub fn drawdown_percent(current_price: f64, ath_price: f64) -> Option<f64> {
    if ath_price > 0.0 && ath_price.is_finite() && current_price.is_finite() {
        Some((ath_price - current_price) / ath_price * 100.0)
    } else {
        None
    }
}

/// Drawdown against a cached ATH record, if there is one.
#[inline]
pub fn drawdown_from_ath(current_price: f64, ath: Option<&AthRecord>) -> Option<f64> {
    ath.and_then(|record| drawdown_percent(current_price, record.ath_price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(ath_price: f64) -> AthRecord {
        AthRecord {
            token_id: "mint".to_string(),
            ath_price,
            ath_market_cap: 0.0,
            ath_time: Utc::now(),
            atl_price: 0.0,
            atl_market_cap: 0.0,
            atl_time: Utc::now(),
            last_updated: Utc::now(),
            window_days: 30,
        }
    }

    #[test]
    fn test_drawdown_formula() {
        assert_eq!(drawdown_percent(40.0, 100.0), Some(60.0));
        assert_eq!(drawdown_percent(100.0, 100.0), Some(0.0));
        assert_eq!(drawdown_percent(0.0, 100.0), Some(100.0));
        assert_eq!(drawdown_percent(150.0, 100.0), Some(-50.0));

        let (current, ath) = (0.000_123, 0.004_56);
        assert_eq!(
            drawdown_percent(current, ath),
            Some((ath - current) / ath * 100.0)
        );
    }

    #[test]
    fn test_drawdown_undefined_without_positive_ath() {
        assert_eq!(drawdown_percent(1.0, 0.0), None);
        assert_eq!(drawdown_percent(1.0, -5.0), None);
        assert_eq!(drawdown_percent(1.0, f64::NAN), None);
        assert_eq!(drawdown_percent(1.0, f64::INFINITY), None);
    }

    #[test]
    fn test_drawdown_from_missing_record() {
        assert_eq!(drawdown_from_ath(1.0, None), None);
        assert_eq!(drawdown_from_ath(25.0, Some(&record(100.0))), Some(75.0));
        assert_eq!(drawdown_from_ath(25.0, Some(&record(0.0))), None);
    }
}
