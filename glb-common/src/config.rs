//! Configuration management for the scanner.
//!
//! A run is configured by a single JSON file (`glb.json` in the working
//! directory unless `--config` points elsewhere). Notification credentials
//! live apart from it in `notify_config.json` so the scan configuration can be
//! shared without leaking the bot token.
//!
//! # Configuration Priority
//!
//! 1. Default values
//! 2. Explicit config file values
//! 3. Environment variables (GLB_* prefix)
//! 4. Command line flags (applied by the binary)
//!
//! # Environment Variable Mapping
//!
//! - `GLB_TICKERS_FILE` → scanner.tickers_file
//! - `GLB_BENCHMARK` → scanner.benchmark
//! - `GLB_BATCH_SIZE` → scanner.batch_size
//! - `GLB_WEBHOOK_URL` → webhook.url
//! - `GLB_LOG_LEVEL` → observability.log_level
//! - `GLB_LOG_FORMAT` → observability.log_format
//! - `GLB_TELEGRAM_BOT_TOKEN` → telegram.bot_token (notify config)
//! - `GLB_TELEGRAM_CHAT_ID` → telegram.chat_id (notify config)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default scan configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "glb.json";

/// Default notification configuration file name.
pub const DEFAULT_NOTIFY_CONFIG_FILE: &str = "notify_config.json";

/// Longest accepted retry delay or batch pause, in seconds.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Expand `~` and environment variables in a configured path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for a scan run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Signal computation and batching
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Output file locations and report format
    #[serde(default)]
    pub output: OutputConfig,

    /// Live per-signal webhook
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Market data provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Logging
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicitly requested file must exist. When no path is given the
    /// default file is used if present, otherwise defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(Error::Configuration(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                Self::load_from(p)
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    tracing::info!("Config file not found, using defaults");
                    return Ok(Self::default());
                }
                Self::load_from(&default_path)
            }
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration, apply environment overrides and validate.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("GLB_TICKERS_FILE") {
            self.scanner.tickers_file = path;
        }
        if let Ok(symbol) = std::env::var("GLB_BENCHMARK") {
            self.scanner.benchmark = symbol;
        }
        if let Ok(size) = std::env::var("GLB_BATCH_SIZE") {
            if let Ok(n) = size.parse() {
                self.scanner.batch_size = n;
            }
        }
        if let Ok(url) = std::env::var("GLB_WEBHOOK_URL") {
            self.webhook.url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Ok(level) = std::env::var("GLB_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("GLB_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }
}

// ============================================================================
// Scanner Configuration
// ============================================================================

/// Windows, thresholds and batching for the breakout scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Ticker list, one symbol per line
    #[serde(default = "default_tickers_file")]
    pub tickers_file: String,

    /// Reference symbol for relative strength
    #[serde(default = "default_benchmark")]
    pub benchmark: String,

    /// Green line lookback (years)
    #[serde(default = "default_lookback_years_glb")]
    pub lookback_years_glb: f64,

    /// Relative strength lookback (years)
    #[serde(default = "default_lookback_years_rs")]
    pub lookback_years_rs: f64,

    /// Volume moving average length (bars)
    #[serde(default = "default_volume_sma_length")]
    pub volume_sma_length: usize,

    /// Last volume must exceed `volume_multiplier × SMA`
    #[serde(default = "default_volume_multiplier")]
    pub volume_multiplier: f64,

    /// Tickers fetched per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Fetch attempts per batch before giving up
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed sleep between failed attempts (seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,

    /// Pause between batches (seconds)
    #[serde(default = "default_batch_pause_secs")]
    pub batch_pause_secs: f64,

    /// Minimal series length for a reliable computation
    #[serde(default = "default_min_trading_days_required")]
    pub min_trading_days_required: usize,

    /// Years → bars conversion
    #[serde(default = "default_trading_days_per_year")]
    pub trading_days_per_year: usize,

    /// Extra calendar days fetched beyond the longest lookback
    #[serde(default = "default_history_padding_days")]
    pub history_padding_days: i64,

    /// Parallel requests inside one batch
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,

    /// Timeout for a single provider request (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            tickers_file: default_tickers_file(),
            benchmark: default_benchmark(),
            lookback_years_glb: default_lookback_years_glb(),
            lookback_years_rs: default_lookback_years_rs(),
            volume_sma_length: default_volume_sma_length(),
            volume_multiplier: default_volume_multiplier(),
            batch_size: default_batch_size(),
            retry_count: default_retry_count(),
            retry_delay_secs: default_retry_delay_secs(),
            batch_pause_secs: default_batch_pause_secs(),
            min_trading_days_required: default_min_trading_days_required(),
            trading_days_per_year: default_trading_days_per_year(),
            history_padding_days: default_history_padding_days(),
            fetch_concurrency: default_fetch_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ScannerConfig {
    /// Green line window in bars.
    pub fn bars_glb(&self) -> usize {
        (self.lookback_years_glb * self.trading_days_per_year as f64) as usize
    }

    /// Relative strength window in bars.
    pub fn bars_rs(&self) -> usize {
        (self.lookback_years_rs * self.trading_days_per_year as f64) as usize
    }

    /// Shortest series the evaluator will compute on.
    pub fn min_series_len(&self) -> usize {
        self.bars_glb()
            .max(self.bars_rs())
            .max(self.volume_sma_length)
            .max(self.min_trading_days_required)
    }

    /// Calendar days of history to request.
    pub fn history_days(&self) -> i64 {
        let years = self.lookback_years_glb.max(self.lookback_years_rs);
        (years * 365.25) as i64 + self.history_padding_days
    }

    pub fn retry_delay(&self) -> Duration {
        delay(self.retry_delay_secs)
    }

    pub fn batch_pause(&self) -> Duration {
        delay(self.batch_pause_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_tickers_file() -> String {
    "nifty500_tickers.txt".to_string()
}

fn default_benchmark() -> String {
    "NIFTY_50.NS".to_string()
}

fn default_lookback_years_glb() -> f64 {
    5.0
}

fn default_lookback_years_rs() -> f64 {
    3.0
}

fn default_volume_sma_length() -> usize {
    20
}

fn default_volume_multiplier() -> f64 {
    1.0
}

fn default_batch_size() -> usize {
    60
}

fn default_retry_count() -> u32 {
    3
}

/// Seconds clamped into `0..=MAX_DELAY_SECS`; NaN becomes zero.
fn delay(secs: f64) -> Duration {
    Duration::from_secs_f64(secs.max(0.0).min(MAX_DELAY_SECS))
}

fn default_retry_delay_secs() -> f64 {
    2.0
}

fn default_batch_pause_secs() -> f64 {
    1.0
}

fn default_min_trading_days_required() -> usize {
    60
}

fn default_trading_days_per_year() -> usize {
    252
}

fn default_history_padding_days() -> i64 {
    60
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_request_timeout_secs() -> u64 {
    30
}

// ============================================================================
// Output Configuration
// ============================================================================

/// Where scan results and reports are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Full scan results, signals first
    #[serde(default = "default_csv_path")]
    pub csv_path: String,

    /// JSON-lines records, same order as the CSV
    #[serde(default = "default_jsonl_path")]
    pub jsonl_path: String,

    /// Directory for exported reports
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Report file name prefix
    #[serde(default = "default_report_prefix")]
    pub report_prefix: String,

    /// Report format ("xlsx", "html" or "markdown")
    #[serde(default = "default_report_format")]
    pub report_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            jsonl_path: default_jsonl_path(),
            report_dir: default_report_dir(),
            report_prefix: default_report_prefix(),
            report_format: default_report_format(),
        }
    }
}

fn default_csv_path() -> String {
    "glb_signals.csv".to_string()
}

fn default_jsonl_path() -> String {
    "glb_signals.jsonl".to_string()
}

fn default_report_dir() -> String {
    ".".to_string()
}

fn default_report_prefix() -> String {
    "GLB".to_string()
}

fn default_report_format() -> String {
    "xlsx".to_string()
}

// ============================================================================
// Webhook Configuration
// ============================================================================

/// Optional fire-and-forget webhook invoked for every detected signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Target URL; disabled when absent
    #[serde(default)]
    pub url: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,

    /// Message text sent with each signal
    #[serde(default = "default_webhook_message")]
    pub message: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
            message: default_webhook_message(),
        }
    }
}

impl WebhookConfig {
    pub fn is_enabled(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

fn default_webhook_timeout_secs() -> u64 {
    5
}

fn default_webhook_message() -> String {
    "GLB + RS + VOL SIGNAL".to_string()
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Market data provider endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Chart API base URL
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_provider_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; glb-scanner)".to_string()
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

// ============================================================================
// Notification Configuration
// ============================================================================

/// Contents of `notify_config.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

impl NotifyConfig {
    /// Load the notification config.
    ///
    /// Returns `Ok(None)` when the file does not exist; notification is then
    /// a no-op rather than an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config = serde_json::from_str(&content).map_err(|e| {
            Error::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;

        Ok(Some(config))
    }

    /// Load, then let `GLB_TELEGRAM_*` variables fill or override credentials.
    pub fn load_with_env(path: &Path) -> Result<Option<Self>> {
        let mut config = Self::load(path)?;

        let token = std::env::var("GLB_TELEGRAM_BOT_TOKEN").ok();
        let chat_id = std::env::var("GLB_TELEGRAM_CHAT_ID").ok();

        if token.is_some() || chat_id.is_some() {
            let telegram = config
                .get_or_insert_with(Self::default)
                .telegram
                .get_or_insert_with(TelegramConfig::default);
            if token.is_some() {
                telegram.bot_token = token;
            }
            if chat_id.is_some() {
                telegram.chat_id = chat_id;
            }
        }

        Ok(config)
    }
}

/// Telegram bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default)]
    pub chat_id: Option<String>,

    /// Attach the exported report
    #[serde(default = "default_true")]
    pub send_file: bool,

    /// Stay silent when the scan found nothing
    #[serde(default = "default_true")]
    pub send_only_if_breakouts: bool,

    /// Bot API base URL
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            send_file: true,
            send_only_if_breakouts: true,
            api_base: default_telegram_api_base(),
        }
    }
}

impl TelegramConfig {
    /// Bot token and chat id, both required.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let token = self
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty());
        let chat_id = self.chat_id.as_deref().filter(|c| !c.trim().is_empty());

        match (token, chat_id) {
            (Some(t), Some(c)) => Ok((t, c)),
            _ => Err(Error::Configuration(
                "bot_token or chat_id missing in telegram config".into(),
            )),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scanner.batch_size, 60);
        assert_eq!(config.scanner.retry_count, 3);
        assert_eq!(config.scanner.volume_sma_length, 20);
        assert!((config.scanner.volume_multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.scanner.benchmark, "NIFTY_50.NS");
        assert!(!config.webhook.is_enabled());
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_derived_windows() {
        let scanner = ScannerConfig::default();
        assert_eq!(scanner.bars_glb(), 1260);
        assert_eq!(scanner.bars_rs(), 756);
        assert_eq!(scanner.min_series_len(), 1260);
        assert_eq!(scanner.history_days(), 1826 + 60);
        assert_eq!(scanner.retry_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_min_series_len_follows_longest_window() {
        let scanner = ScannerConfig {
            lookback_years_glb: 0.1,
            lookback_years_rs: 0.2,
            volume_sma_length: 20,
            min_trading_days_required: 10,
            ..Default::default()
        };
        assert_eq!(scanner.bars_glb(), 25);
        assert_eq!(scanner.bars_rs(), 50);
        assert_eq!(scanner.min_series_len(), 50);
    }

    #[test]
    fn test_delays_are_clamped() {
        let config = ScannerConfig {
            retry_delay_secs: 1e20,
            batch_pause_secs: f64::NAN,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(), Duration::from_secs(3600));
        assert_eq!(config.batch_pause(), Duration::ZERO);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"scanner": {{"batch_size": 25, "benchmark": "^NSEI"}}, "webhook": {{"url": "http://localhost:9/hook"}}}}"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.scanner.batch_size, 25);
        assert_eq!(config.scanner.benchmark, "^NSEI");
        assert_eq!(config.scanner.retry_count, 3);
        assert!(config.webhook.is_enabled());
        assert_eq!(config.webhook.timeout_secs, 5);
        assert_eq!(config.output.csv_path, "glb_signals.csv");
    }

    #[test]
    fn test_explicit_missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_notify_config_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = NotifyConfig::load(&dir.path().join(DEFAULT_NOTIFY_CONFIG_FILE)).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_notify_config_defaults_and_credentials() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"telegram": {{"bot_token": "123:abc"}}}}"#).unwrap();

        let cfg = NotifyConfig::load(file.path()).unwrap().unwrap();
        let telegram = cfg.telegram.unwrap();
        assert!(telegram.send_file);
        assert!(telegram.send_only_if_breakouts);
        assert_eq!(telegram.api_base, "https://api.telegram.org");
        assert!(telegram.credentials().unwrap_err().is_configuration());

        let complete = TelegramConfig {
            chat_id: Some("-100".into()),
            ..telegram
        };
        assert_eq!(complete.credentials().unwrap(), ("123:abc", "-100"));
    }

    #[test]
    fn test_expand_path_plain() {
        assert_eq!(expand_path("glb_signals.csv"), PathBuf::from("glb_signals.csv"));
    }
}
