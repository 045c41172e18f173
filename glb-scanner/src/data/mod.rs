//! Market data for the breakout scan.
//!
//! Provides the daily bar types, the provider abstraction, the batch fetcher
//! with bounded retry and the benchmark aligner.
//!
//! # Data Sources
//! - **Yahoo chart API**: daily OHLCV + adjusted close per symbol

mod align;
mod fetcher;
mod provider;
mod tickers;
mod yahoo;

pub use align::{align, AlignError, AlignedSeries};
pub use fetcher::{BatchFetcher, BatchFrame, SymbolData};
pub use provider::{HistoryProvider, ProviderError};
pub use tickers::{load_tickers, COMMENT_MARKER};
pub use yahoo::YahooAdapter;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Data Types
// ============================================================================

/// One trading-day observation. Any field may be missing upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading day
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    /// Split/dividend adjusted close
    #[serde(default)]
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
}

impl Bar {
    /// A bar with every price and the volume present.
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            adj_close: None,
            volume: Some(volume),
        }
    }

    /// True when no value at all was observed for this day.
    pub fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.close.is_none()
            && self.adj_close.is_none()
            && self.volume.is_none()
    }

    /// Close price, falling back to adjusted close.
    pub fn effective_close(&self) -> Option<f64> {
        self.close.or(self.adj_close)
    }
}

/// Keep only finite numbers; providers encode gaps as null or NaN.
pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Daily bars for one symbol in non-decreasing date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    symbol: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Build a series; bars are sorted by date (stable, duplicates kept).
    pub fn new(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Drop days on which nothing was observed.
    pub fn without_empty_bars(mut self) -> Self {
        self.bars.retain(|b| !b.is_empty());
        self
    }
}

/// Close prices of the reference symbol, shared read-only by every ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkSeries {
    symbol: String,
    points: Vec<(NaiveDate, f64)>,
}

impl BenchmarkSeries {
    /// Extract usable closes (close, else adjusted close) from a series.
    pub fn from_series(series: &Series) -> Self {
        let points = series
            .bars()
            .iter()
            .filter_map(|b| b.effective_close().map(|c| (b.date, c)))
            .collect();

        Self {
            symbol: series.symbol().to_string(),
            points,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// `(date, close)` pairs in date order.
    pub fn points(&self) -> &[(NaiveDate, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_sorted_on_construction() {
        let series = Series::new(
            "RELIANCE.NS",
            vec![
                Bar::new(day(3), 1.0, 1.0, 1.0, 3.0, 1.0),
                Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 1.0),
                Bar::new(day(2), 1.0, 1.0, 1.0, 2.0, 1.0),
            ],
        );
        let dates: Vec<_> = series.bars().iter().map(|b| b.date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);
        assert_eq!(series.last().unwrap().close, Some(3.0));
    }

    #[test]
    fn test_effective_close_falls_back_to_adjusted() {
        let mut bar = Bar::new(day(1), 1.0, 2.0, 0.5, 1.5, 100.0);
        assert_eq!(bar.effective_close(), Some(1.5));
        bar.close = None;
        assert_eq!(bar.effective_close(), None);
        bar.adj_close = Some(1.4);
        assert_eq!(bar.effective_close(), Some(1.4));
    }

    #[test]
    fn test_without_empty_bars() {
        let empty = Bar {
            date: day(2),
            open: None,
            high: None,
            low: None,
            close: None,
            adj_close: None,
            volume: None,
        };
        let series = Series::new(
            "TCS.NS",
            vec![Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 1.0), empty],
        )
        .without_empty_bars();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_benchmark_skips_missing_closes() {
        let mut gap = Bar::new(day(2), 1.0, 1.0, 1.0, 1.0, 1.0);
        gap.close = None;
        let series = Series::new(
            "NIFTY_50.NS",
            vec![Bar::new(day(1), 1.0, 1.0, 1.0, 100.0, 1.0), gap],
        );
        let bench = BenchmarkSeries::from_series(&series);
        assert_eq!(bench.points(), &[(day(1), 100.0)]);
        assert_eq!(bench.symbol(), "NIFTY_50.NS");
    }

    #[test]
    fn test_finite_filters_nan() {
        assert_eq!(finite(Some(f64::NAN)), None);
        assert_eq!(finite(Some(f64::INFINITY)), None);
        assert_eq!(finite(Some(2.0)), Some(2.0));
    }
}
