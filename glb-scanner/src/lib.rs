//! GLB Scanner Library
//!
//! Scans a ticker universe for Green Line Breakouts: a new multi-year high
//! confirmed by a relative-strength breakout against a benchmark and
//! above-average volume.
//!
//! # Architecture
//!
//! ```text
//! tickers ─▶ batches ─▶ BatchFetcher ─▶ align ─▶ SignalEvaluator
//!                           │                        │
//!                    HistoryProvider          ScanOrchestrator ─▶ webhook
//!                      (Yahoo)                       │
//!                                            CSV / JSONL ─▶ report ─▶ Telegram
//! ```
//!
//! # Signal
//! - **glb**: rolling high of High (5y) makes a new high, close clears it
//! - **rs_break**: close / benchmark makes a new rolling high (3y)
//! - **vol_ok**: volume above multiplier × 20-day average

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod notification;
pub mod output;
pub mod report;
pub mod scanner;
pub mod signal;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use glb_common::config::{expand_path, Config, NotifyConfig};
use glb_common::error::ResultExt;
use glb_common::{Error, Result};

use crate::data::{load_tickers, HistoryProvider, YahooAdapter};
use crate::notification::NotifyOutcome;
use crate::report::{ReportFormat, SignalReport};
use crate::scanner::{ScanOrchestrator, ScanResult, WebhookSink};

/// Errors listed in the end-of-run summary
const SUMMARY_ERROR_LIMIT: usize = 5;

/// What the report step produced.
#[derive(Debug)]
pub struct ReportOutcome {
    pub path: PathBuf,
    pub breakouts: usize,
    pub notify: Option<NotifyOutcome>,
}

/// Scan and report entry points for a loaded configuration.
pub struct ScanService {
    config: Config,
}

impl ScanService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan against the configured Yahoo endpoint and write the outputs.
    pub async fn run_scan(&self) -> Result<ScanResult> {
        let provider = Arc::new(YahooAdapter::from_config(
            &self.config.provider,
            &self.config.scanner,
        ));
        self.run_scan_with(provider).await
    }

    /// Scan with an explicit provider and write the outputs.
    pub async fn run_scan_with<P: HistoryProvider>(&self, provider: Arc<P>) -> Result<ScanResult> {
        let tickers_file = expand_path(&self.config.scanner.tickers_file);
        let tickers = load_tickers(&tickers_file)?;
        info!(
            "Loaded {} tickers from {}",
            tickers.len(),
            tickers_file.display()
        );

        let mut orchestrator = ScanOrchestrator::new(self.config.scanner.clone(), provider);
        if let Some(sink) = WebhookSink::from_config(&self.config.webhook) {
            info!(url = %sink.url(), "Webhook enabled");
            orchestrator = orchestrator.with_sink(Arc::new(sink));
        }

        let result = orchestrator.run(&tickers).await?;
        self.write_outputs(&result)?;
        log_summary(&result);

        Ok(result)
    }

    /// Write the CSV and JSONL outputs.
    pub fn write_outputs(&self, result: &ScanResult) -> Result<()> {
        let csv_path = expand_path(&self.config.output.csv_path);
        output::write_csv(&csv_path, &result.records)
            .context(format!("writing {}", csv_path.display()))?;
        info!("Wrote CSV -> {}", csv_path.display());

        let jsonl_path = expand_path(&self.config.output.jsonl_path);
        output::write_jsonl(&jsonl_path, &result.records)
            .context(format!("writing {}", jsonl_path.display()))?;
        info!("Wrote JSONL -> {}", jsonl_path.display());

        Ok(())
    }

    /// Export the report from a scan CSV, then notify when `send` is set.
    ///
    /// A `None` notify config makes the notify step a no-op.
    pub async fn run_report(
        &self,
        csv_path: &Path,
        notify: Option<&NotifyConfig>,
        send: bool,
    ) -> Result<ReportOutcome> {
        if !csv_path.exists() {
            return Err(Error::Configuration(format!(
                "{} not found",
                csv_path.display()
            )));
        }

        let records = output::read_csv(csv_path)?;
        let report = SignalReport::now(records);
        let format: ReportFormat = self.config.output.report_format.parse()?;

        let path = report.save(
            &expand_path(&self.config.output.report_dir),
            &self.config.output.report_prefix,
            format,
        )?;
        info!("Wrote {}", path.display());

        let breakouts = report.breakouts().len();
        let notify = if send {
            Some(notification::notify_report(notify, &report, Some(&path)).await?)
        } else {
            info!("Notification disabled, skipping send");
            None
        };

        Ok(ReportOutcome {
            path,
            breakouts,
            notify,
        })
    }
}

fn log_summary(result: &ScanResult) {
    if !result.errors.is_empty() {
        warn!(
            "Completed with {} errors. First {} errors: {:?}",
            result.errors.len(),
            SUMMARY_ERROR_LIMIT.min(result.errors.len()),
            result
                .errors
                .iter()
                .take(SUMMARY_ERROR_LIMIT)
                .map(|e| format!("{}: {}", e.ticker, e.error))
                .collect::<Vec<_>>()
        );
    }

    info!("Total signals found: {}", result.signal_count());
    for record in result.signals() {
        info!(
            ticker = %record.ticker,
            date = %record.last_date.map(|d| d.to_string()).unwrap_or_default(),
            close = record.last_close.unwrap_or_default(),
            "Signal"
        );
    }
}
