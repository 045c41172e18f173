//! Per-ticker signal evaluation.

use thiserror::Error;
use tracing::debug;

use glb_common::config::ScannerConfig;

use super::rolling::{rolling_max, rolling_mean};
use super::{Note, SignalRecord};
use crate::data::{align, AlignError, AlignedSeries, BenchmarkSeries, Series};

// ============================================================================
// Parameters
// ============================================================================

/// Window lengths and thresholds, in bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalParams {
    /// Green line window (W_glb)
    pub bars_glb: usize,
    /// Relative strength window (W_rs)
    pub bars_rs: usize,
    /// Volume moving average window (W_vol)
    pub volume_sma_length: usize,
    pub volume_multiplier: f64,
    pub min_trading_days: usize,
}

impl SignalParams {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            bars_glb: config.bars_glb(),
            bars_rs: config.bars_rs(),
            volume_sma_length: config.volume_sma_length,
            volume_multiplier: config.volume_multiplier,
            min_trading_days: config.min_trading_days_required,
        }
    }

    /// Shortest series that is evaluated at all.
    pub fn min_series_len(&self) -> usize {
        self.bars_glb
            .max(self.bars_rs)
            .max(self.volume_sma_length)
            .max(self.min_trading_days)
    }
}

impl Default for SignalParams {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default())
    }
}

// ============================================================================
// Degradation
// ============================================================================

/// A condition that could not be computed; it counts as false.
#[derive(Debug, Error, PartialEq)]
enum Degradation {
    #[error("no previous bar")]
    NoPreviousBar,

    #[error("missing {0} on the last bar")]
    Missing(&'static str),
}

type Condition = std::result::Result<bool, Degradation>;

// ============================================================================
// Evaluator
// ============================================================================

/// Evaluates the breakout conditions for one ticker at a time.
///
/// Stateless apart from its parameters; the same series and benchmark
/// always produce the same record.
#[derive(Debug, Clone, Default)]
pub struct SignalEvaluator {
    params: SignalParams,
}

impl SignalEvaluator {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Evaluate a ticker's series against the shared benchmark.
    ///
    /// Never fails: short-circuits set `notes`, degraded conditions are false.
    pub fn evaluate(&self, series: &Series, benchmark: &BenchmarkSeries) -> SignalRecord {
        let ticker = series.symbol();

        if series.len() < self.params.min_series_len() {
            return SignalRecord::with_note(ticker, Note::InsufficientData);
        }

        let aligned = match align(series, benchmark) {
            Ok(aligned) => aligned,
            Err(AlignError::NoCloseData) => {
                return SignalRecord::with_note(ticker, Note::NoCloseData)
            }
            Err(AlignError::BenchmarkNotAligned) => {
                return SignalRecord::with_note(ticker, Note::BenchNotAligned)
            }
        };

        let last = aligned.len() - 1;
        let mut record = SignalRecord::empty(ticker);
        record.last_date = Some(aligned.dates[last]);
        record.last_close = Some(aligned.close[last]);

        record.glb = settle(ticker, "glb", self.green_line(&aligned));
        record.rs_break = settle(ticker, "rs_break", self.relative_strength(&aligned));
        record.vol_ok = settle(ticker, "vol_ok", self.volume(&aligned));
        record.signal = record.glb && record.rs_break && record.vol_ok;

        record
    }

    /// New rolling high of High, confirmed by the close.
    fn green_line(&self, s: &AlignedSeries) -> Condition {
        let hh = rolling_max(&s.high, self.params.bars_glb);
        let (today, yesterday) = last_two(&hh)?;
        let today = today.ok_or(Degradation::Missing("rolling high"))?;
        let yesterday = yesterday.ok_or(Degradation::Missing("previous rolling high"))?;
        let close = s.close[s.len() - 1];

        Ok(today > yesterday && close > yesterday)
    }

    /// Close / benchmark above its previous rolling high.
    fn relative_strength(&self, s: &AlignedSeries) -> Condition {
        let rs: Vec<Option<f64>> = s
            .close
            .iter()
            .zip(&s.benchmark)
            .map(|(&close, bench)| match bench {
                Some(b) if *b != 0.0 => Some(close / b).filter(|v| v.is_finite()),
                _ => None,
            })
            .collect();

        let rs_high = rolling_max(&rs, self.params.bars_rs);
        let (_, previous_high) = last_two(&rs_high)?;
        let today = rs[rs.len() - 1].ok_or(Degradation::Missing("relative strength"))?;
        let previous_high =
            previous_high.ok_or(Degradation::Missing("previous relative strength high"))?;

        Ok(today > previous_high)
    }

    /// Volume above `multiplier × SMA`.
    fn volume(&self, s: &AlignedSeries) -> Condition {
        let sma = rolling_mean(&s.volume, self.params.volume_sma_length);
        let last = s.len() - 1;
        let volume = s.volume[last].ok_or(Degradation::Missing("volume"))?;
        let average = sma[last].ok_or(Degradation::Missing("volume average"))?;

        Ok(volume > self.params.volume_multiplier * average)
    }
}

fn last_two(column: &[Option<f64>]) -> std::result::Result<(Option<f64>, Option<f64>), Degradation> {
    match column {
        [.., previous, last] => Ok((*last, *previous)),
        _ => Err(Degradation::NoPreviousBar),
    }
}

fn settle(ticker: &str, condition: &'static str, outcome: Condition) -> bool {
    outcome.unwrap_or_else(|reason| {
        debug!(ticker, condition, reason = %reason, "Condition degraded to false");
        false
    })
}

// ============================================================================
// Tests
// ============================================================================
