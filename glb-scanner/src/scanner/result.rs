//! Scan output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::signal::SignalRecord;

/// A ticker that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub ticker: String,
    pub error: String,
}

impl ErrorRecord {
    pub fn new(ticker: impl Into<String>, error: impl ToString) -> Self {
        Self {
            ticker: ticker.into(),
            error: error.to_string(),
        }
    }
}

/// Result of a full scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    /// Run ID
    pub run_id: String,
    /// Signals first, then ticker ascending
    pub records: Vec<SignalRecord>,
    /// Tickers whose fetch or evaluation failed
    pub errors: Vec<ErrorRecord>,
    /// Tickers loaded for the run
    pub total_tickers: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ScanResult {
    /// Finalize accumulated records into output order.
    pub fn new(
        run_id: String,
        mut records: Vec<SignalRecord>,
        errors: Vec<ErrorRecord>,
        total_tickers: usize,
        started_at: DateTime<Utc>,
    ) -> Self {
        sort_records(&mut records);
        Self {
            run_id,
            records,
            errors,
            total_tickers,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Records with `signal = true`, in ticker order.
    pub fn signals(&self) -> impl Iterator<Item = &SignalRecord> {
        self.records.iter().filter(|r| r.signal)
    }

    pub fn signal_count(&self) -> usize {
        self.signals().count()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Summary string for logging.
    pub fn summary(&self) -> String {
        format!(
            "Scanned {} tickers in {:.1}s: {} records, {} signals, {} errors",
            self.total_tickers,
            self.duration_secs(),
            self.records.len(),
            self.signal_count(),
            self.errors.len()
        )
    }
}

/// `signal = true` first, then ticker ascending (stable for duplicates).
pub fn sort_records(records: &mut [SignalRecord]) {
    records.sort_by(compare_records);
}

fn compare_records(a: &SignalRecord, b: &SignalRecord) -> Ordering {
    b.signal
        .cmp(&a.signal)
        .then_with(|| a.ticker.cmp(&b.ticker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ticker: &str, signal: bool) -> SignalRecord {
        SignalRecord {
            signal,
            ..SignalRecord::empty(ticker)
        }
    }

    #[test]
    fn test_sort_signal_first_then_ticker() {
        let mut records = vec![
            record("WIPRO.NS", false),
            record("TCS.NS", true),
            record("ADANI.NS", false),
            record("INFY.NS", true),
        ];
        sort_records(&mut records);

        let order: Vec<_> = records.iter().map(|r| (r.ticker.as_str(), r.signal)).collect();
        assert_eq!(
            order,
            vec![
                ("INFY.NS", true),
                ("TCS.NS", true),
                ("ADANI.NS", false),
                ("WIPRO.NS", false)
            ]
        );
    }

    #[test]
    fn test_summary_counts() {
        let result = ScanResult::new(
            "scan_test".into(),
            vec![record("B", true), record("A", false)],
            vec![ErrorRecord::new("C", "boom")],
            3,
            Utc::now(),
        );
        assert_eq!(result.signal_count(), 1);
        assert_eq!(result.records[0].ticker, "B");
        assert!(result.summary().contains("1 signals, 1 errors"));
    }
}
