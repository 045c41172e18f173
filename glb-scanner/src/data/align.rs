//! Benchmark alignment.
//!
//! Produces the typed per-ticker columns the evaluator works on: days
//! without a usable close are dropped, and the benchmark is reindexed onto
//! the remaining trading days. Only benchmark closes on the exact same dates
//! are kept; gaps are then forward filled along the ticker's own days and
//! leading gaps back filled from the first matched value.

use chrono::NaiveDate;

use super::{BenchmarkSeries, Series};

/// Why a series could not be aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignError {
    /// No bar has a close or adjusted close
    NoCloseData,
    /// Every aligned benchmark value is missing
    BenchmarkNotAligned,
}

/// One ticker's columns on its own trading-day index.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub dates: Vec<NaiveDate>,
    pub high: Vec<Option<f64>>,
    /// Close with adjusted-close fallback; never missing
    pub close: Vec<f64>,
    pub volume: Vec<Option<f64>>,
    /// Benchmark close per day
    pub benchmark: Vec<Option<f64>>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Align a ticker series against the shared benchmark.
pub fn align(series: &Series, benchmark: &BenchmarkSeries) -> Result<AlignedSeries, AlignError> {
    let mut dates = Vec::with_capacity(series.len());
    let mut high = Vec::with_capacity(series.len());
    let mut close = Vec::with_capacity(series.len());
    let mut volume = Vec::with_capacity(series.len());

    for bar in series.bars() {
        if let Some(c) = bar.effective_close() {
            dates.push(bar.date);
            high.push(bar.high);
            close.push(c);
            volume.push(bar.volume);
        }
    }

    if dates.is_empty() {
        return Err(AlignError::NoCloseData);
    }

    let aligned = reindex_benchmark(&dates, benchmark);
    if aligned.iter().all(Option::is_none) {
        return Err(AlignError::BenchmarkNotAligned);
    }

    Ok(AlignedSeries {
        dates,
        high,
        close,
        volume,
        benchmark: aligned,
    })
}

/// Put benchmark closes on `dates` (ascending): exact-date match, then
/// forward fill, then back fill.
///
/// A benchmark close dated between two ticker days is never used; the later
/// ticker day carries the earlier day's value instead.
pub fn reindex_benchmark(dates: &[NaiveDate], benchmark: &BenchmarkSeries) -> Vec<Option<f64>> {
    let points = benchmark.points();
    let mut out = Vec::with_capacity(dates.len());
    let mut cursor = 0;
    let mut carried: Option<f64> = None;

    for &date in dates {
        while cursor < points.len() && points[cursor].0 < date {
            cursor += 1;
        }
        if let Some(&(day, close)) = points.get(cursor) {
            if day == date {
                carried = Some(close);
            }
        }
        out.push(carried);
    }

    if let Some(first) = out.iter().flatten().next().copied() {
        for value in out.iter_mut().take_while(|v| v.is_none()) {
            *value = Some(first);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Bar;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bench(points: &[(u32, f64)]) -> BenchmarkSeries {
        let bars = points
            .iter()
            .map(|&(d, c)| Bar::new(day(d), c, c, c, c, 1.0))
            .collect();
        BenchmarkSeries::from_series(&Series::new("NIFTY_50.NS", bars))
    }

    #[test]
    fn test_reindex_exact_forward_and_back_fill() {
        let b = bench(&[(4, 100.0), (6, 102.0), (7, 103.0)]);
        let dates = vec![day(1), day(4), day(5), day(7), day(9)];
        let aligned = reindex_benchmark(&dates, &b);
        assert_eq!(
            aligned,
            vec![Some(100.0), Some(100.0), Some(100.0), Some(103.0), Some(103.0)]
        );
    }

    #[test]
    fn test_forward_fill_carries_previous_ticker_day() {
        // Ticker skips the 5th; the benchmark's 5th close is not on its index.
        let b = bench(&[(4, 100.0), (5, 50.0)]);
        let aligned = reindex_benchmark(&[day(4), day(6)], &b);
        assert_eq!(aligned, vec![Some(100.0), Some(100.0)]);
    }

    #[test]
    fn test_back_fill_uses_first_matched_day() {
        // The 2nd exists in the benchmark but not on the ticker index.
        let b = bench(&[(2, 90.0), (5, 100.0), (6, 101.0)]);
        let aligned = reindex_benchmark(&[day(3), day(5), day(6)], &b);
        assert_eq!(aligned, vec![Some(100.0), Some(100.0), Some(101.0)]);
    }

    #[test]
    fn test_no_shared_dates_is_not_aligned() {
        let series = Series::new("TCS.NS", vec![Bar::new(day(3), 1.0, 1.0, 1.0, 1.0, 1.0)]);
        let err = align(&series, &bench(&[(2, 100.0), (4, 101.0)])).unwrap_err();
        assert_eq!(err, AlignError::BenchmarkNotAligned);
    }

    #[test]
    fn test_empty_benchmark_is_not_aligned() {
        let series = Series::new("TCS.NS", vec![Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 1.0)]);
        let err = align(&series, &BenchmarkSeries::default()).unwrap_err();
        assert_eq!(err, AlignError::BenchmarkNotAligned);
    }

    #[test]
    fn test_no_close_data() {
        let mut bar = Bar::new(day(1), 1.0, 1.0, 1.0, 1.0, 1.0);
        bar.close = None;
        let series = Series::new("TCS.NS", vec![bar]);
        let err = align(&series, &bench(&[(1, 100.0)])).unwrap_err();
        assert_eq!(err, AlignError::NoCloseData);
    }

    #[test]
    fn test_align_drops_days_without_close() {
        let mut gap = Bar::new(day(2), 1.0, 9.0, 1.0, 1.0, 5.0);
        gap.close = None;
        let mut adjusted = Bar::new(day(3), 1.0, 2.0, 1.0, 1.0, 7.0);
        adjusted.close = None;
        adjusted.adj_close = Some(1.8);

        let series = Series::new(
            "INFY.NS",
            vec![Bar::new(day(1), 1.0, 2.0, 1.0, 1.5, 3.0), gap, adjusted],
        );
        let aligned = align(&series, &bench(&[(1, 100.0)])).unwrap();

        assert_eq!(aligned.dates, vec![day(1), day(3)]);
        assert_eq!(aligned.close, vec![1.5, 1.8]);
        assert_eq!(aligned.volume, vec![Some(3.0), Some(7.0)]);
        assert_eq!(aligned.benchmark, vec![Some(100.0), Some(100.0)]);
    }
}
