//! Breakout signal computation.
//!
//! A ticker signals when three independent trailing-window conditions hold
//! on its last bar:
//! - **glb**: the multi-year rolling high of High makes a new high and the
//!   close clears the previous rolling high
//! - **rs_break**: close / benchmark makes a new multi-year high
//! - **vol_ok**: volume beats a multiple of its short moving average

mod evaluator;
pub mod rolling;

pub use evaluator::{SignalEvaluator, SignalParams};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason an evaluation stopped before computing the conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Note {
    /// Fewer bars than the longest window or the minimum history
    InsufficientData,
    /// No bar carries a close or adjusted close
    NoCloseData,
    /// Benchmark has no value on any of the ticker's days
    BenchNotAligned,
    /// Provider returned nothing for the symbol
    NoData,
}

impl Note {
    pub fn as_str(&self) -> &'static str {
        match self {
            Note::InsufficientData => "insufficient_data",
            Note::NoCloseData => "no_close_data",
            Note::BenchNotAligned => "bench_not_aligned",
            Note::NoData => "no_data",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one ticker. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub ticker: String,
    #[serde(rename = "date")]
    pub last_date: Option<NaiveDate>,
    #[serde(rename = "close")]
    pub last_close: Option<f64>,
    pub glb: bool,
    pub rs_break: bool,
    pub vol_ok: bool,
    pub signal: bool,
    #[serde(default)]
    pub notes: String,
}

impl SignalRecord {
    /// A record with every condition false and no last bar.
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            last_date: None,
            last_close: None,
            glb: false,
            rs_break: false,
            vol_ok: false,
            signal: false,
            notes: String::new(),
        }
    }

    /// A short-circuited record.
    pub fn with_note(ticker: impl Into<String>, note: Note) -> Self {
        Self {
            notes: note.as_str().to_string(),
            ..Self::empty(ticker)
        }
    }
}
