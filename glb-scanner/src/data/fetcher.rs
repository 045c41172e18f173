//! Batch fetching with bounded retry.
//!
//! A batch is all-or-nothing per attempt: any recoverable provider failure
//! (network, rate limit, 5xx) abandons the attempt, the fetcher sleeps a
//! fixed delay and tries the whole batch again. After `retry_count`
//! attempts the batch fails with `DataUnavailable`.

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use glb_common::config::ScannerConfig;
use glb_common::{Error, Result};

use super::provider::{HistoryProvider, ProviderError};
use super::Series;

// ============================================================================
// Batch Frame
// ============================================================================

/// What a batch fetch produced for one symbol.
#[derive(Debug, Clone)]
pub enum SymbolData {
    /// Bars were returned (empty days already dropped)
    Series(Series),
    /// Unknown symbol or no bars in range
    Missing,
    /// Malformed payload for this symbol only
    Failed(ProviderError),
}

/// Result of one successful batch attempt, keyed by symbol.
#[derive(Debug, Default)]
pub struct BatchFrame {
    series: HashMap<String, Series>,
    failures: HashMap<String, ProviderError>,
}

impl BatchFrame {
    /// Extract a symbol's data. Repeated symbols get the same data.
    pub fn get(&self, symbol: &str) -> SymbolData {
        if let Some(series) = self.series.get(symbol) {
            return SymbolData::Series(series.clone());
        }
        if let Some(err) = self.failures.get(symbol) {
            return SymbolData::Failed(err.clone());
        }
        SymbolData::Missing
    }

    /// Symbols with usable bars.
    pub fn available(&self) -> usize {
        self.series.len()
    }
}

// ============================================================================
// Batch Fetcher
// ============================================================================

/// Drives a `HistoryProvider` over a batch of symbols with retry.
pub struct BatchFetcher<P: HistoryProvider> {
    provider: Arc<P>,
    retry_count: u32,
    retry_delay: Duration,
    concurrency: usize,
}

impl<P: HistoryProvider> BatchFetcher<P> {
    /// Create a fetcher using the scanner's retry and concurrency settings.
    pub fn new(provider: Arc<P>, config: &ScannerConfig) -> Self {
        Self {
            provider,
            retry_count: config.retry_count.max(1),
            retry_delay: config.retry_delay(),
            concurrency: config.fetch_concurrency.max(1),
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Fetch `[today - days_back, today]` for every symbol.
    pub async fn fetch(&self, symbols: &[String], days_back: i64) -> Result<BatchFrame> {
        let end = Local::now().date_naive();
        let start = end - ChronoDuration::days(days_back);
        self.fetch_between(symbols, start, end).await
    }

    /// Fetch an explicit date range, retrying the whole batch on failure.
    pub async fn fetch_between(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BatchFrame> {
        let mut last_error = String::new();

        for attempt in 1..=self.retry_count {
            match self.attempt(symbols, start, end).await {
                Ok(frame) => {
                    debug!(
                        attempt,
                        symbols = symbols.len(),
                        available = frame.available(),
                        "Batch fetched"
                    );
                    return Ok(frame);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.retry_count,
                        provider = self.provider.name(),
                        error = %e,
                        "Batch fetch failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.retry_count {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(Error::DataUnavailable {
            scope: describe(symbols),
            attempts: self.retry_count,
            last_error,
        })
    }

    /// One attempt over the whole batch.
    async fn attempt(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> std::result::Result<BatchFrame, ProviderError> {
        let provider = &self.provider;

        let responses: Vec<(String, std::result::Result<Series, ProviderError>)> =
            stream::iter(symbols.iter().cloned())
                .map(|symbol| async move {
                    let result = provider.fetch_daily(&symbol, start, end).await;
                    (symbol, result)
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut frame = BatchFrame::default();

        for (symbol, result) in responses {
            match result {
                Ok(series) => {
                    let series = series.without_empty_bars();
                    if !series.is_empty() {
                        frame.series.insert(symbol, series);
                    }
                }
                Err(e) if e.is_recoverable() => return Err(e),
                Err(ProviderError::DataNotAvailable(msg)) => {
                    debug!(symbol = %symbol, reason = %msg, "No data for symbol");
                }
                Err(e) => {
                    frame.failures.insert(symbol, e);
                }
            }
        }

        Ok(frame)
    }
}

fn describe(symbols: &[String]) -> String {
    match symbols {
        [only] => only.clone(),
        [first, ..] => format!("batch of {} starting at {}", symbols.len(), first),
        [] => "empty batch".to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
