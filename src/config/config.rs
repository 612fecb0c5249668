use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::scanner::Thresholds;
use crate::utils::RetryPolicy;

/// Credentials and endpoints for the two market data providers.
///
/// - Jupiter token search: live price, market cap, holder and windowed trade stats
/// - Solana Tracker price range: historical high/low used as the ATH baseline
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub jupiter_api_key: String,
    pub solana_tracker_api_key: String,
    #[serde(default = "default_jupiter_base_url")]
    pub jupiter_base_url: String,
    #[serde(default = "default_solana_tracker_base_url")]
    pub solana_tracker_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_jupiter_base_url() -> String {
    "https://api.jup.ag".to_string()
}

fn default_solana_tracker_base_url() -> String {
    "https://data.solanatracker.io".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Scan cadence, detection thresholds and provider pacing.
///
/// Delays exist only to stay under provider rate limits; tests set them to zero.
#[derive(Debug, Deserialize, Clone)]
pub struct ScannerSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_progress_log_secs")]
    pub progress_log_secs: u64,

    // Detection thresholds
    #[serde(default = "default_min_drawdown_percent")]
    pub min_drawdown_percent: f64,
    #[serde(default = "default_min_volume_change_percent")]
    pub min_volume_change_percent: f64,
    #[serde(default = "default_min_volume_change_percent_micro")]
    pub min_volume_change_percent_micro: f64,
    #[serde(default = "default_micro_cap_threshold")]
    pub micro_cap_threshold: f64,

    // ATH cache
    #[serde(default = "default_ath_window_days")]
    pub ath_window_days: u32,
    #[serde(default = "default_ath_refresh_margin")]
    pub ath_refresh_margin: f64,

    // Provider pacing
    #[serde(default = "default_prefilter_delay_ms")]
    pub prefilter_delay_ms: u64,
    #[serde(default = "default_token_delay_ms")]
    pub token_delay_ms: u64,
    #[serde(default = "default_range_pause_ms")]
    pub range_pause_ms: u64,

    // Retry budgets
    #[serde(default = "default_ath_retry_attempts")]
    pub ath_retry_attempts: u32,
    #[serde(default = "default_ath_retry_delay_ms")]
    pub ath_retry_delay_ms: u64,
    #[serde(default = "default_quote_retry_attempts")]
    pub quote_retry_attempts: u32,
    #[serde(default = "default_quote_retry_delay_ms")]
    pub quote_retry_delay_ms: u64,
}

fn default_interval_secs() -> u64 {
    300 // 5 minutes
}

fn default_progress_log_secs() -> u64 {
    60
}

fn default_min_drawdown_percent() -> f64 {
    60.0
}

fn default_min_volume_change_percent() -> f64 {
    15.0
}

fn default_min_volume_change_percent_micro() -> f64 {
    50.0
}

fn default_micro_cap_threshold() -> f64 {
    100_000.0
}

fn default_ath_window_days() -> u32 {
    30
}

fn default_ath_refresh_margin() -> f64 {
    0.05
}

fn default_prefilter_delay_ms() -> u64 {
    1_000
}

fn default_token_delay_ms() -> u64 {
    2_000
}

fn default_range_pause_ms() -> u64 {
    2_000
}

fn default_ath_retry_attempts() -> u32 {
    3
}

fn default_ath_retry_delay_ms() -> u64 {
    3_000
}

fn default_quote_retry_attempts() -> u32 {
    2
}

fn default_quote_retry_delay_ms() -> u64 {
    1_000
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            progress_log_secs: default_progress_log_secs(),
            min_drawdown_percent: default_min_drawdown_percent(),
            min_volume_change_percent: default_min_volume_change_percent(),
            min_volume_change_percent_micro: default_min_volume_change_percent_micro(),
            micro_cap_threshold: default_micro_cap_threshold(),
            ath_window_days: default_ath_window_days(),
            ath_refresh_margin: default_ath_refresh_margin(),
            prefilter_delay_ms: default_prefilter_delay_ms(),
            token_delay_ms: default_token_delay_ms(),
            range_pause_ms: default_range_pause_ms(),
            ath_retry_attempts: default_ath_retry_attempts(),
            ath_retry_delay_ms: default_ath_retry_delay_ms(),
            quote_retry_attempts: default_quote_retry_attempts(),
            quote_retry_delay_ms: default_quote_retry_delay_ms(),
        }
    }
}

impl ScannerSettings {
    /// Settings with every provider delay zeroed. Used by tests and dry runs.
    pub fn without_delays() -> Self {
        Self {
            prefilter_delay_ms: 0,
            token_delay_ms: 0,
            range_pause_ms: 0,
            ath_retry_delay_ms: 0,
            quote_retry_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn progress_log_interval(&self) -> Duration {
        Duration::from_secs(self.progress_log_secs)
    }

    pub fn prefilter_delay(&self) -> Duration {
        Duration::from_millis(self.prefilter_delay_ms)
    }

    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }

    pub fn range_pause(&self) -> Duration {
        Duration::from_millis(self.range_pause_ms)
    }

    pub fn ath_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.ath_retry_attempts,
            Duration::from_millis(self.ath_retry_delay_ms),
        )
    }

    pub fn quote_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.quote_retry_attempts,
            Duration::from_millis(self.quote_retry_delay_ms),
        )
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_drawdown_percent: self.min_drawdown_percent,
            min_volume_change_percent: self.min_volume_change_percent,
            min_volume_change_percent_micro: self.min_volume_change_percent_micro,
            micro_cap_threshold: self.micro_cap_threshold,
        }
    }
}

/// Local file locations for durable state and the operator's watchlist.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_watchlist")]
    pub watchlist: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_watchlist() -> PathBuf {
    PathBuf::from("watchlist.txt")
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            watchlist: default_watchlist(),
        }
    }
}

/// Audible alert configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct NotificationSettings {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
    /// External command used to play a WAV file (receives the path as its only argument)
    #[serde(default = "default_player")]
    pub player: String,
    #[serde(default = "default_spike_sound")]
    pub spike_sound: PathBuf,
    #[serde(default = "default_breakout_sound")]
    pub breakout_sound: PathBuf,
}

fn default_notifications_enabled() -> bool {
    true
}

fn default_player() -> String {
    if cfg!(target_os = "macos") {
        "afplay".to_string()
    } else {
        "aplay".to_string()
    }
}

fn default_spike_sound() -> PathBuf {
    PathBuf::from("sounds/Wow.wav")
}

fn default_breakout_sound() -> PathBuf {
    PathBuf::from("sounds/Alert.wav")
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
            player: default_player(),
            spike_sound: default_spike_sound(),
            breakout_sound: default_breakout_sound(),
        }
    }
}

/// Root application configuration.
///
/// Loaded from `config.yaml` (or `.toml`/`.json`) at startup, with
/// `FALLEN__SECTION__KEY` environment variables taking precedence.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl Settings {
    pub fn new() -> anyhow::Result<Self> {
        let s = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("FALLEN").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        let settings: Settings = s
            .try_deserialize()
            .context("Configuration is missing required fields")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Rejects configurations that would make every cycle fail or misclassify.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.jupiter_api_key.trim().is_empty() {
            bail!("api.jupiter_api_key must not be empty");
        }
        if self.api.solana_tracker_api_key.trim().is_empty() {
            bail!("api.solana_tracker_api_key must not be empty");
        }
        if self.scanner.interval_secs == 0 {
            bail!("scanner.interval_secs must be greater than zero");
        }
        if self.scanner.ath_retry_attempts == 0 || self.scanner.quote_retry_attempts == 0 {
            bail!("retry attempts must be at least 1");
        }
        if !(0.0..=100.0).contains(&self.scanner.min_drawdown_percent) {
            bail!("scanner.min_drawdown_percent must be within 0..=100");
        }
        if self.scanner.ath_refresh_margin < 0.0 {
            bail!("scanner.ath_refresh_margin must not be negative");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(yaml: &str) -> anyhow::Result<Settings> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let settings = parse(
            r#"
api:
  jupiter_api_key: "jup"
  solana_tracker_api_key: "st"
"#,
        )
        .unwrap();

        assert_eq!(settings.scanner.interval_secs, 300);
        assert_eq!(settings.scanner.min_drawdown_percent, 60.0);
        assert_eq!(settings.scanner.min_volume_change_percent, 15.0);
        assert_eq!(settings.scanner.min_volume_change_percent_micro, 50.0);
        assert_eq!(settings.scanner.micro_cap_threshold, 100_000.0);
        assert_eq!(settings.scanner.ath_window_days, 30);
        assert_eq!(settings.scanner.ath_retry().max_attempts, 3);
        assert_eq!(settings.storage.data_dir, PathBuf::from("data"));
        assert_eq!(settings.storage.watchlist, PathBuf::from("watchlist.txt"));
        assert_eq!(settings.api.jupiter_base_url, "https://api.jup.ag");
        assert!(settings.notifications.enabled);
    }

    #[test]
    fn test_missing_credentials_are_rejected() {
        assert!(parse("scanner:\n  interval_secs: 60\n").is_err());
    }

    #[test]
    fn test_blank_credentials_are_rejected() {
        let result = parse(
            r#"
api:
  jupiter_api_key: "  "
  solana_tracker_api_key: "st"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_are_applied() {
        let settings = parse(
            r#"
api:
  jupiter_api_key: "jup"
  solana_tracker_api_key: "st"
scanner:
  interval_secs: 120
  min_volume_change_percent: 20
  token_delay_ms: 0
notifications:
  enabled: false
"#,
        )
        .unwrap();

        assert_eq!(settings.scanner.interval_secs, 120);
        assert_eq!(settings.scanner.thresholds().min_volume_change_percent, 20.0);
        assert_eq!(settings.scanner.token_delay(), Duration::ZERO);
        assert!(!settings.notifications.enabled);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = parse(
            r#"
api:
  jupiter_api_key: "jup"
  solana_tracker_api_key: "st"
scanner:
  interval_secs: 0
"#,
        );
        assert!(result.is_err());
    }
}
