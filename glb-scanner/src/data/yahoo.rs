//! Yahoo Finance chart API adapter.
//!
//! # Endpoint
//! `GET /v8/finance/chart/{symbol}?interval=1d&period1=..&period2=..`
//!
//! One request per symbol. Daily bars carry OHLCV plus the adjusted close;
//! missing observations come back as `null` and are kept as gaps.
//! Timestamps are the session open in UTC and are converted to the
//! exchange-local trading day with the `gmtoffset` from the response meta.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use glb_common::config::{ProviderConfig, ScannerConfig};

use super::provider::{HistoryProvider, ProviderError};
use super::{finite, Bar, Series};

// ============================================================================
// Constants
// ============================================================================

/// Chart endpoint path prefix
const CHART_PATH: &str = "v8/finance/chart";

/// Retry hint after a 429
const RATE_LIMIT_RETRY_SECS: u64 = 2;

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo chart adapter for daily history.
pub struct YahooAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl YahooAdapter {
    /// Create an adapter for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Create from config
    pub fn from_config(provider: &ProviderConfig, scanner: &ScannerConfig) -> Self {
        Self::new(
            provider.base_url.clone(),
            &provider.user_agent,
            scanner.request_timeout(),
        )
    }

    fn chart_url(&self, symbol: &str) -> Result<reqwest::Url, ProviderError> {
        let mut url = reqwest::Url::parse(&format!("{}/{}", self.base_url, CHART_PATH))
            .map_err(|e| ProviderError::InvalidRequest(format!("bad base url: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("base url cannot carry a path".into()))?
            .push(symbol);

        Ok(url)
    }

    /// Parse a chart payload into a series.
    fn parse_chart(symbol: &str, response: ChartResponse) -> Result<Series, ProviderError> {
        if let Some(error) = response.chart.error {
            let description = error.description.unwrap_or_default();
            if error.code.eq_ignore_ascii_case("Not Found") {
                return Err(ProviderError::DataNotAvailable(format!(
                    "{}: {}",
                    symbol, description
                )));
            }
            return Err(ProviderError::Internal(format!(
                "{}: {} {}",
                symbol, error.code, description
            )));
        }

        let result = response
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("{}: empty result", symbol)))?;

        let timestamps = result.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            return Ok(Series::new(symbol, Vec::new()));
        }

        let offset = result.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
        let adjclose = result
            .indicators
            .adjclose
            .and_then(|a| a.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let at = |column: &[Option<f64>], i: usize| finite(column.get(i).copied().flatten());

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = Utc
                .timestamp_opt(ts + offset, 0)
                .single()
                .ok_or_else(|| ProviderError::Internal(format!("invalid timestamp: {}", ts)))?
                .date_naive();

            bars.push(Bar {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                adj_close: at(&adjclose, i),
                volume: at(&quote.volume, i),
            });
        }

        Ok(Series::new(symbol, bars))
    }
}

// ============================================================================
// HistoryProvider Implementation
// ============================================================================

#[async_trait]
impl HistoryProvider for YahooAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, ProviderError> {
        let url = self.chart_url(symbol)?;

        let period1 = start
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();

        debug!(url = %url, symbol, "Fetching daily chart");

        let response = self
            .client
            .get(url)
            .query(&[
                ("interval", "1d".to_string()),
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::DataNotAvailable(symbol.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after_secs: Some(RATE_LIMIT_RETRY_SECS),
            });
        }

        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {}", status)));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Internal(format!("HTTP {}: {}", status, body)));
        }

        // A body cut short or timing out mid-read is a transport failure
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Network("Response body timeout".into())
            } else {
                ProviderError::Network(format!("Failed to read response: {}", e))
            }
        })?;

        let payload: ChartResponse = serde_json::from_slice(&body)
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))?;

        Self::parse_chart(symbol, payload)
    }
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
    adjclose: Option<Vec<AdjCloseColumn>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Series, ProviderError> {
        let response: ChartResponse = serde_json::from_value(value).unwrap();
        YahooAdapter::parse_chart("RELIANCE.NS", response)
    }

    #[test]
    fn test_parse_chart_with_gaps() {
        // 2024-01-01T03:45:00Z and 2024-01-02T03:45:00Z, IST offset
        let series = parse(json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": 19800},
                    "timestamp": [1704080700, 1704167100],
                    "indicators": {
                        "quote": [{
                            "open": [100.0, null],
                            "high": [105.0, null],
                            "low": [99.0, null],
                            "close": [104.0, null],
                            "volume": [12000, 0]
                        }],
                        "adjclose": [{"adjclose": [103.5, 101.0]}]
                    }
                }],
                "error": null
            }
        }))
        .unwrap();

        assert_eq!(series.len(), 2);
        let first = &series.bars()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.close, Some(104.0));
        assert_eq!(first.adj_close, Some(103.5));
        assert_eq!(first.volume, Some(12000.0));

        let second = &series.bars()[1];
        assert_eq!(second.close, None);
        assert_eq!(second.effective_close(), Some(101.0));
    }

    #[test]
    fn test_parse_chart_not_found() {
        let err = parse(json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        }))
        .unwrap_err();
        assert!(matches!(err, ProviderError::DataNotAvailable(_)));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let series = parse(json!({
            "chart": {
                "result": [{"meta": {}, "indicators": {"quote": [{}]}}],
                "error": null
            }
        }))
        .unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_chart_url_encodes_symbol() {
        let adapter = YahooAdapter::new(
            "https://query1.finance.yahoo.com/",
            "test",
            Duration::from_secs(5),
        );
        let url = adapter.chart_url("RELIANCE.NS").unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/RELIANCE.NS"
        );

        let url = adapter.chart_url("BRK/B").unwrap();
        assert!(url.as_str().ends_with("/v8/finance/chart/BRK%2FB"));
    }

    #[test]
    fn test_provider_name() {
        let adapter = YahooAdapter::new("http://localhost", "test", Duration::from_secs(1));
        assert_eq!(adapter.name(), "yahoo");
    }
}
