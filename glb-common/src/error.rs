//! Error types for the Green Line Breakout scanner.

use thiserror::Error;

/// Result type alias using the scanner error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for scanner runs.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid input file, option or credential
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote data could not be fetched after exhausting retries
    #[error("Data unavailable for {scope} after {attempts} attempts: {last_error}")]
    DataUnavailable {
        scope: String,
        attempts: u32,
        last_error: String,
    },

    /// Report could not be rendered
    #[error("Report error: {0}")]
    Report(String),

    /// Notification channel rejected a request
    #[error("Notification error: {0}")]
    Notification(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Configuration(_) => true,
            Self::WithContext { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// Check if this is a data availability error.
    pub fn is_data_unavailable(&self) -> bool {
        match self {
            Self::DataUnavailable { .. } => true,
            Self::WithContext { source, .. } => source.is_data_unavailable(),
            _ => false,
        }
    }

    /// Process exit status for this error.
    ///
    /// `0` is reserved for a run that completed (even with per-ticker errors).
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::DataUnavailable { .. } => 3,
            Self::WithContext { source, .. } => source.exit_code(),
            _ => 1,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
