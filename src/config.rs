use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const OPENSEA_API_URL: &str = "https://api.opensea.io/api/v2";

/// Default scan period (seconds). 20 minutes.
pub const MONITOR_INTERVAL_SECS: u64 = 1200;

/// Upstream providers hard-reject bursts; never space calls closer than this.
pub const MIN_REQUEST_DELAY_MS: u64 = 500;

/// Per-request HTTP timeout (seconds). Exceeding it is a network failure.
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Maximum scan-cycle summaries kept in the persisted log. Oldest evicted first.
pub const ALERT_HISTORY_CAP: usize = 100;

/// A result qualifies for the watch list at or above this risk score.
pub const HIGH_PRIORITY_SCORE: u8 = 60;

/// Anomaly detector thresholds.
pub mod thresholds {
    /// One-day volume change (percent) that raises VOLUME_SURGE.
    pub const VOLUME_SURGE_PCT: f64 = 100.0;
    /// Above this the surge is HIGH severity.
    pub const VOLUME_SURGE_HIGH_PCT: f64 = 300.0;
    /// One-day sales vs. 30-day daily average multiple that raises SALES_SPIKE.
    pub const SALES_SPIKE_MULTIPLE: f64 = 3.0;
    /// Relative floor deviation from the one-day average price.
    pub const FLOOR_MOVE_RATIO: f64 = 0.20;
    pub const FLOOR_MOVE_HIGH_RATIO: f64 = 0.40;
    /// Absolute market cap delta in ETH-equivalent units.
    pub const MARKET_CAP_SHIFT: f64 = 100.0;
    pub const MARKET_CAP_SHIFT_HIGH: f64 = 500.0;
    /// Relative deviation of average sale value from baseline.
    pub const LISTING_PATTERN_RATIO: f64 = 0.5;
}

/// Whale scan defaults.
pub mod whales {
    /// Minimum sale price (ETH) for a transaction to count as a whale trade.
    pub const MIN_SALE_VALUE: f64 = 10.0;
    /// A buyer with at least this many qualifying purchases is a whale.
    pub const MIN_PURCHASES: usize = 2;
    /// ...or with at least this much aggregate spend.
    pub const MIN_TOTAL_SPENT: f64 = 20.0;
    /// Whale transactions in the last hour that signal accumulation.
    pub const ACCUMULATION_TX_COUNT: usize = 5;
    pub const MAJOR_INTEREST_WHALES: usize = 3;
    pub const MAJOR_INTEREST_TOP_SPEND: f64 = 50.0;
    pub const TOP_WHALES: usize = 5;
    pub const EVENT_LIMIT: usize = 100;
}

/// Trending collections with one-day change at or below this are dropped.
pub const TRENDING_MIN_CHANGE_PCT: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub opensea_api_key: String,
    pub opensea_api_url: String,
    pub log_level: String,
    /// Persisted monitoring log (MONITOR_LOG_PATH)
    pub log_path: PathBuf,
    /// Scan period in seconds (MONITOR_INTERVAL_SECS)
    pub interval_secs: u64,
    /// Collections per scan cycle (MONITOR_BATCH_SIZE)
    pub batch_size: usize,
    /// Explicit collection slugs to scan (MONITOR_COLLECTIONS, comma-separated).
    /// Empty means discover the top collections by one-day volume.
    pub collections: Vec<String>,
    /// Spacing between upstream calls (REQUEST_DELAY_MS), never below MIN_REQUEST_DELAY_MS
    pub request_delay_ms: u64,
    pub http_timeout_secs: u64,
    /// Cycles without requalifying before a watch-list entry expires (0 = never)
    pub watchlist_expiry_cycles: u32,
    /// Samples kept per collection by the rolling baseline (BASELINE_WINDOW)
    pub baseline_window: usize,
    /// HTTP API port (API_PORT). The monitor serves the dashboard only when set.
    pub api_port: Option<u16>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Checked by `api_key()` when a marketplace client is built; `serve`
        // runs without one.
        let opensea_api_key = std::env::var("OPENSEA_API_KEY")
            .map(|k| k.trim().to_string())
            .unwrap_or_default();

        let api_port = match std::env::var("API_PORT") {
            Ok(p) => Some(p.parse::<u16>().map_err(|_| {
                AppError::Config("API_PORT must be a valid port number".to_string())
            })?),
            Err(_) => None,
        };

        Ok(Self {
            opensea_api_key,
            opensea_api_url: std::env::var("OPENSEA_API_URL")
                .unwrap_or_else(|_| OPENSEA_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_path: std::env::var("MONITOR_LOG_PATH")
                .unwrap_or_else(|_| "monitoring-log.json".to_string())
                .into(),
            interval_secs: std::env::var("MONITOR_INTERVAL_SECS")
                .unwrap_or_else(|_| MONITOR_INTERVAL_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(MONITOR_INTERVAL_SECS)
                .max(1),
            batch_size: std::env::var("MONITOR_BATCH_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse::<usize>()
                .unwrap_or(50)
                .max(1),
            collections: parse_list(&std::env::var("MONITOR_COLLECTIONS").unwrap_or_default()),
            request_delay_ms: std::env::var("REQUEST_DELAY_MS")
                .unwrap_or_else(|_| MIN_REQUEST_DELAY_MS.to_string())
                .parse::<u64>()
                .unwrap_or(MIN_REQUEST_DELAY_MS)
                .max(MIN_REQUEST_DELAY_MS),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .unwrap_or(HTTP_TIMEOUT_SECS)
                .max(1),
            watchlist_expiry_cycles: std::env::var("WATCHLIST_EXPIRY_CYCLES")
                .unwrap_or_else(|_| "72".to_string())
                .parse::<u32>()
                .unwrap_or(72),
            baseline_window: std::env::var("BASELINE_WINDOW")
                .unwrap_or_else(|_| "72".to_string())
                .parse::<usize>()
                .unwrap_or(72)
                .max(1),
            api_port,
        })
    }

    /// The marketplace API key. Missing or blank is a fatal configuration error.
    pub fn api_key(&self) -> Result<&str> {
        let key = self.opensea_api_key.trim();
        if key.is_empty() {
            return Err(AppError::Config(
                "OPENSEA_API_KEY is not set; the monitor refuses to start without a marketplace API key"
                    .to_string(),
            ));
        }
        Ok(key)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms.max(MIN_REQUEST_DELAY_MS))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
impl Config {
    /// Defaults for a client pointed at `api_url`.
    pub fn for_tests(api_url: &str) -> Self {
        Self {
            opensea_api_key: "test-key".to_string(),
            opensea_api_url: api_url.to_string(),
            log_level: "info".to_string(),
            log_path: PathBuf::from("monitoring-log.json"),
            interval_secs: MONITOR_INTERVAL_SECS,
            batch_size: 50,
            collections: Vec::new(),
            request_delay_ms: MIN_REQUEST_DELAY_MS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            watchlist_expiry_cycles: 72,
            baseline_window: 72,
            api_port: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_list_skips_blanks() {
        assert_eq!(
            parse_list(" azuki, ,pudgypenguins,"),
            vec!["azuki".to_string(), "pudgypenguins".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn request_delay_never_below_minimum() {
        let cfg = Config {
            request_delay_ms: 100,
            ..Config::for_tests(OPENSEA_API_URL)
        };
        assert_eq!(cfg.request_delay(), Duration::from_millis(MIN_REQUEST_DELAY_MS));
        assert_eq!(cfg.interval(), Duration::from_secs(1200));
    }

    #[test]
    fn blank_api_key_is_config_error() {
        let cfg = Config {
            opensea_api_key: "   ".to_string(),
            ..Config::for_tests(OPENSEA_API_URL)
        };
        assert!(matches!(cfg.api_key(), Err(AppError::Config(_))));
        assert_eq!(Config::for_tests(OPENSEA_API_URL).api_key().unwrap(), "test-key");
    }

    // Only test in the crate that touches the process environment.
    #[test]
    fn zero_timeout_and_batch_are_clamped() {
        std::env::set_var("HTTP_TIMEOUT_SECS", "0");
        std::env::set_var("MONITOR_BATCH_SIZE", "0");
        std::env::set_var("MONITOR_INTERVAL_SECS", "0");
        let cfg = Config::from_env().unwrap();
        std::env::remove_var("HTTP_TIMEOUT_SECS");
        std::env::remove_var("MONITOR_BATCH_SIZE");
        std::env::remove_var("MONITOR_INTERVAL_SECS");

        assert_eq!(cfg.http_timeout_secs, 1);
        assert_eq!(cfg.http_timeout(), Duration::from_secs(1));
        assert_eq!(cfg.batch_size, 1);
        assert_eq!(cfg.interval_secs, 1);
    }
}
