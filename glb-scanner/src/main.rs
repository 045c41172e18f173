//! GLB Scanner - Green Line Breakout scanner CLI.
//!
//! Scans the configured ticker universe, writes CSV/JSONL outputs, exports
//! the report and pushes it to Telegram.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use glb_common::config::{expand_path, Config, NotifyConfig, DEFAULT_NOTIFY_CONFIG_FILE};
use glb_common::logging::init_logging;
use glb_scanner::notification::check_telegram;
use glb_scanner::ScanService;

#[derive(Parser, Debug)]
#[command(name = "glb-scanner")]
#[command(version)]
#[command(about = "Green Line Breakout + RS + volume scanner.", long_about = None)]
struct Cli {
    /// Config file (default: ./glb.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the ticker universe and write CSV/JSONL outputs
    Scan {
        /// Ticker list, one symbol per line
        #[arg(long)]
        tickers: Option<String>,

        /// Benchmark symbol
        #[arg(long)]
        benchmark: Option<String>,

        /// Tickers per download batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// POST each signal to this URL
        #[arg(long)]
        webhook_url: Option<String>,

        /// Export the report and notify after the scan
        #[arg(long)]
        report: bool,

        /// Notification config (with --report)
        #[arg(long, default_value = DEFAULT_NOTIFY_CONFIG_FILE)]
        notify_config: String,
    },

    /// Export the report from a scan CSV and notify
    Report {
        /// Scan CSV (default: configured output)
        #[arg(long)]
        csv: Option<String>,

        /// Notification config
        #[arg(long, default_value = DEFAULT_NOTIFY_CONFIG_FILE)]
        notify_config: String,

        /// Export only, do not send
        #[arg(long)]
        no_notify: bool,
    },

    /// Check the Telegram bot token and send a test message
    TelegramCheck {
        /// Notification config
        #[arg(long, default_value = DEFAULT_NOTIFY_CONFIG_FILE)]
        notify_config: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<glb_common::Error>()
                .map(glb_common::Error::exit_code)
                .unwrap_or(1);
            tracing::error!(exit_code = code, "{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_with_env(cli.config.as_deref())?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("GLB Scanner v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Scan {
            tickers,
            benchmark,
            batch_size,
            webhook_url,
            report,
            notify_config,
        } => {
            if let Some(path) = tickers {
                config.scanner.tickers_file = path;
            }
            if let Some(symbol) = benchmark {
                config.scanner.benchmark = symbol;
            }
            if let Some(size) = batch_size {
                config.scanner.batch_size = size;
            }
            if let Some(url) = webhook_url {
                config.webhook.url = Some(url);
            }
            config.validate().map_err(glb_common::Error::from)?;

            let service = ScanService::new(config);
            service.run_scan().await.context("Scan failed")?;

            if report {
                let notify = NotifyConfig::load_with_env(&expand_path(&notify_config))?;
                let csv = expand_path(&service.config().output.csv_path);
                service
                    .run_report(&csv, notify.as_ref(), true)
                    .await
                    .context("Report failed")?;
            }
        }

        Commands::Report {
            csv,
            notify_config,
            no_notify,
        } => {
            let service = ScanService::new(config);
            let csv = expand_path(csv.as_deref().unwrap_or(&service.config().output.csv_path));
            let notify = if no_notify {
                None
            } else {
                NotifyConfig::load_with_env(&expand_path(&notify_config))?
            };

            let outcome = service
                .run_report(&csv, notify.as_ref(), !no_notify)
                .await
                .context("Report failed")?;

            tracing::info!(
                report = %outcome.path.display(),
                breakouts = outcome.breakouts,
                notify = ?outcome.notify,
                "Report complete"
            );
        }

        Commands::TelegramCheck { notify_config } => {
            let path = expand_path(&notify_config);
            let telegram = NotifyConfig::load_with_env(&path)?
                .and_then(|c| c.telegram)
                .ok_or_else(|| {
                    glb_common::Error::Configuration(format!(
                        "no telegram config in {}",
                        path.display()
                    ))
                })?;

            check_telegram(&telegram).await?;
        }
    }

    Ok(())
}
