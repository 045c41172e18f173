//! GLB Common - shared configuration, errors and logging for the
//! Green Line Breakout scanner.
//!
//! This crate provides:
//! - Configuration types and loading (`glb.json`, `notify_config.json`)
//! - Configuration validation
//! - The unified error type and its process exit codes
//! - Logging setup
//! - Log redaction helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod util;
pub mod validation;

pub use config::{
    Config, NotifyConfig, ObservabilityConfig, OutputConfig, ProviderConfig, ScannerConfig,
    TelegramConfig, WebhookConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
