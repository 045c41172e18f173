//! Configuration validation.
//!
//! Rejects option values that would make a scan meaningless before any
//! network traffic happens.

use thiserror::Error;

use crate::config::{
    Config, ObservabilityConfig, OutputConfig, ScannerConfig, WebhookConfig, MAX_DELAY_SECS,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ValidationError> for crate::error::Error {
    fn from(err: ValidationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.scanner.validate() {
            errors.push(e);
        }
        if let Err(e) = self.output.validate() {
            errors.push(e);
        }
        if let Err(e) = self.webhook.validate() {
            errors.push(e);
        }
        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        collect(errors)
    }
}

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}

impl Validate for ScannerConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if self.tickers_file.trim().is_empty() {
            errors.push(ValidationError::invalid("scanner.tickers_file", "must not be empty"));
        }
        if self.benchmark.trim().is_empty() {
            errors.push(ValidationError::invalid("scanner.benchmark", "must not be empty"));
        }
        if !(self.lookback_years_glb > 0.0) {
            errors.push(ValidationError::invalid(
                "scanner.lookback_years_glb",
                "must be positive",
            ));
        }
        if !(self.lookback_years_rs > 0.0) {
            errors.push(ValidationError::invalid(
                "scanner.lookback_years_rs",
                "must be positive",
            ));
        }
        if self.trading_days_per_year == 0 {
            errors.push(ValidationError::invalid(
                "scanner.trading_days_per_year",
                "must be at least 1",
            ));
        }
        if self.volume_sma_length == 0 {
            errors.push(ValidationError::invalid(
                "scanner.volume_sma_length",
                "must be at least 1",
            ));
        }
        if !(self.volume_multiplier >= 0.0) {
            errors.push(ValidationError::invalid(
                "scanner.volume_multiplier",
                "must not be negative",
            ));
        }
        if self.batch_size == 0 {
            errors.push(ValidationError::invalid("scanner.batch_size", "must be at least 1"));
        }
        if self.retry_count == 0 {
            errors.push(ValidationError::invalid("scanner.retry_count", "must be at least 1"));
        }
        for (field, secs) in [
            ("scanner.retry_delay_secs", self.retry_delay_secs),
            ("scanner.batch_pause_secs", self.batch_pause_secs),
        ] {
            if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
                errors.push(ValidationError::invalid(
                    field,
                    format!("must be between 0 and {} seconds", MAX_DELAY_SECS),
                ));
            }
        }
        if self.fetch_concurrency == 0 {
            errors.push(ValidationError::invalid(
                "scanner.fetch_concurrency",
                "must be at least 1",
            ));
        }
        if self.request_timeout_secs == 0 {
            errors.push(ValidationError::invalid(
                "scanner.request_timeout_secs",
                "every remote call needs a timeout",
            ));
        }

        collect(errors)
    }
}

impl Validate for OutputConfig {
    fn validate(&self) -> ValidationResult<()> {
        match self.report_format.to_lowercase().as_str() {
            "xlsx" | "html" | "markdown" | "md" => Ok(()),
            other => Err(ValidationError::invalid(
                "output.report_format",
                format!("unknown format '{}'", other),
            )),
        }
    }
}

impl Validate for WebhookConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.is_enabled() && self.timeout_secs == 0 {
            return Err(ValidationError::invalid(
                "webhook.timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => errors.push(ValidationError::invalid(
                "observability.log_level",
                format!("unknown level '{}'", other),
            )),
        }
        match self.log_format.as_str() {
            "json" | "pretty" => {}
            other => errors.push(ValidationError::invalid(
                "observability.log_format",
                format!("unknown format '{}'", other),
            )),
        }

        collect(errors)
    }
}
