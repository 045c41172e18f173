//! Data provider abstraction for historical daily bars.
//!
//! Defines the `HistoryProvider` trait the batch fetcher drives, so the
//! scan can run against the Yahoo adapter or an in-memory source in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;

use super::Series;

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to data providers.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Rate limit exceeded
    RateLimited { retry_after_secs: Option<u64> },
    /// Unknown symbol or no history in the requested range
    DataNotAvailable(String),
    /// Provider is temporarily unavailable (5xx)
    Unavailable(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Malformed payload or other provider-side problem
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::Unavailable(msg) => write!(f, "Provider unavailable: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Transport-level failures worth retrying the whole batch for.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimited { .. } | Self::Unavailable(_)
        )
    }
}

// ============================================================================
// History Provider Trait
// ============================================================================

/// Source of historical daily bars.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Provider name for logging (e.g., "yahoo")
    fn name(&self) -> &'static str;

    /// Fetch daily bars for `symbol` over `[start, end]`.
    ///
    /// Unknown symbols should return `ProviderError::DataNotAvailable`
    /// rather than an empty success, but both are tolerated.
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Series, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_recoverable() {
        assert!(ProviderError::Network("timeout".into()).is_recoverable());
        assert!(ProviderError::RateLimited { retry_after_secs: Some(60) }.is_recoverable());
        assert!(ProviderError::Unavailable("maintenance".into()).is_recoverable());
        assert!(!ProviderError::DataNotAvailable("no data".into()).is_recoverable());
        assert!(!ProviderError::Internal("bad json".into()).is_recoverable());
    }

    #[test]
    fn test_provider_error_display() {
        assert_eq!(
            ProviderError::RateLimited { retry_after_secs: Some(2) }.to_string(),
            "Rate limited, retry after 2 seconds"
        );
        assert_eq!(
            ProviderError::DataNotAvailable("XYZ.NS".into()).to_string(),
            "Data not available: XYZ.NS"
        );
    }
}
