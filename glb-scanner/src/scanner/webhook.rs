//! Live signal push.
//!
//! Each detected signal is POSTed once as JSON while the scan runs. Delivery
//! is best effort: failures are logged by the caller and never retried.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use std::time::Duration;

use glb_common::config::WebhookConfig;

use crate::signal::SignalRecord;

/// Receives signals as they are detected.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn publish(&self, record: &SignalRecord) -> Result<()>;
}

/// Webhook request body
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    ticker: &'a str,
    date: Option<NaiveDate>,
    close: Option<f64>,
    message: &'a str,
}

/// POSTs `{ticker, date, close, message}` to a fixed URL.
pub struct WebhookSink {
    url: String,
    message: String,
    client: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, message: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            url: url.into(),
            message: message.into(),
            client,
        }
    }

    /// Build from config; `None` when no URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Option<Self> {
        if !config.is_enabled() {
            return None;
        }
        Some(Self::new(
            config.url.as_deref()?.trim(),
            config.message.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SignalSink for WebhookSink {
    async fn publish(&self, record: &SignalRecord) -> Result<()> {
        let payload = WebhookPayload {
            ticker: &record.ticker,
            date: record.last_date,
            close: record.last_close,
            message: &self.message,
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("HTTP {}: {}", status, error_text);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = WebhookPayload {
            ticker: "RELIANCE.NS",
            date: NaiveDate::from_ymd_opt(2024, 5, 2),
            close: Some(2950.5),
            message: "GLB + RS + VOL SIGNAL",
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "ticker": "RELIANCE.NS",
                "date": "2024-05-02",
                "close": 2950.5,
                "message": "GLB + RS + VOL SIGNAL"
            })
        );
    }

    #[test]
    fn test_from_config_disabled_without_url() {
        let config = WebhookConfig {
            url: None,
            ..Default::default()
        };
        assert!(WebhookSink::from_config(&config).is_none());

        let config = WebhookConfig {
            url: Some("  ".into()),
            ..Default::default()
        };
        assert!(WebhookSink::from_config(&config).is_none());
    }
}
