//! Scan orchestrator.
//!
//! Drives the whole run: benchmark first (fatal on failure), then the ticker
//! universe in fixed-size batches, strictly one batch at a time.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use glb_common::config::ScannerConfig;
use glb_common::{Error, Result};

use crate::data::{BatchFetcher, BenchmarkSeries, HistoryProvider, SymbolData};
use crate::signal::{Note, SignalEvaluator, SignalParams, SignalRecord};

use super::result::{ErrorRecord, ScanResult};
use super::webhook::SignalSink;

/// The scan orchestrator.
///
/// 1. Fetch the benchmark once; abort the run if it cannot be fetched
/// 2. Fetch each batch with retry; a failed batch becomes one error per ticker
/// 3. Evaluate every ticker of a fetched batch against the shared benchmark
/// 4. Push signals to the sink as they are found
/// 5. Sort the accumulated records
pub struct ScanOrchestrator<P: HistoryProvider> {
    config: ScannerConfig,
    fetcher: BatchFetcher<P>,
    evaluator: SignalEvaluator,
    sink: Option<Arc<dyn SignalSink>>,
}

impl<P: HistoryProvider> ScanOrchestrator<P> {
    pub fn new(config: ScannerConfig, provider: Arc<P>) -> Self {
        let fetcher = BatchFetcher::new(provider, &config);
        let evaluator = SignalEvaluator::new(SignalParams::from_config(&config));

        Self {
            config,
            fetcher,
            evaluator,
            sink: None,
        }
    }

    /// Publish every signal to `sink` while scanning.
    pub fn with_sink(mut self, sink: Arc<dyn SignalSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Scan `tickers` and return the sorted result.
    ///
    /// Only a benchmark failure is an error; batch and ticker failures are
    /// recorded in the result.
    pub async fn run(&self, tickers: &[String]) -> Result<ScanResult> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let days_back = self.config.history_days();

        info!(
            run_id = %run_id,
            tickers = tickers.len(),
            min_bars = self.config.min_series_len(),
            provider = self.fetcher.provider_name(),
            "Starting GLB scan"
        );

        let benchmark = self.fetch_benchmark(days_back).await?;

        let batch_size = self.config.batch_size.max(1);
        let total_batches = tickers.len().div_ceil(batch_size);
        info!(
            "Processing {} batches (batch size up to {})...",
            total_batches, batch_size
        );

        let mut records = Vec::with_capacity(tickers.len());
        let mut errors = Vec::new();

        for (index, batch) in tickers.chunks(batch_size).enumerate() {
            info!(
                "[{}/{}] Downloading batch of {} tickers...",
                index + 1,
                total_batches,
                batch.len()
            );

            let frame = match self.fetcher.fetch(batch, days_back).await {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(batch = index + 1, error = %e, "Batch download failed, skipping batch");
                    errors.extend(batch.iter().map(|t| ErrorRecord::new(t.clone(), &e)));
                    tokio::time::sleep(self.config.retry_delay()).await;
                    continue;
                }
            };

            for symbol in batch {
                match frame.get(symbol) {
                    SymbolData::Series(series) => {
                        let record = self.evaluator.evaluate(&series, &benchmark);
                        if record.signal {
                            self.publish(&record).await;
                        }
                        records.push(record);
                    }
                    SymbolData::Missing => {
                        debug!(symbol = %symbol, "No data returned");
                        records.push(SignalRecord::with_note(symbol.clone(), Note::NoData));
                    }
                    SymbolData::Failed(e) => {
                        warn!(symbol = %symbol, error = %e, "Error processing ticker");
                        errors.push(ErrorRecord::new(symbol.clone(), e));
                    }
                }
            }

            tokio::time::sleep(self.config.batch_pause()).await;
        }

        let result = ScanResult::new(run_id, records, errors, tickers.len(), started_at);
        info!("{}", result.summary());

        Ok(result)
    }

    /// Fetch the shared benchmark. Any failure aborts the run.
    async fn fetch_benchmark(&self, days_back: i64) -> Result<BenchmarkSeries> {
        let symbol = self.config.benchmark.clone();
        info!(benchmark = %symbol, "Downloading benchmark...");

        let frame = self
            .fetcher
            .fetch(std::slice::from_ref(&symbol), days_back)
            .await?;

        match frame.get(&symbol) {
            SymbolData::Series(series) => {
                let benchmark = BenchmarkSeries::from_series(&series);
                debug!(benchmark = %symbol, points = benchmark.len(), "Benchmark ready");
                Ok(benchmark)
            }
            SymbolData::Missing => {
                // Every ticker will report bench_not_aligned
                warn!(benchmark = %symbol, "Benchmark returned no data");
                Ok(BenchmarkSeries::default())
            }
            SymbolData::Failed(e) => Err(Error::DataUnavailable {
                scope: symbol,
                attempts: 1,
                last_error: e.to_string(),
            }),
        }
    }

    async fn publish(&self, record: &SignalRecord) {
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.publish(record).await {
            Ok(()) => debug!(ticker = %record.ticker, "Signal pushed to webhook"),
            Err(e) => warn!(ticker = %record.ticker, error = %e, "Webhook post error"),
        }
    }
}
