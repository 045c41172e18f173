//! Telegram notification for scan reports.
//!
//! Sends a short HTML summary of the breakouts and, optionally, the exported
//! report file through the Telegram Bot API. Sends are never retried.

use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use glb_common::config::{NotifyConfig, TelegramConfig};
use glb_common::util::{sanitize_for_log, truncate_with_ellipsis};
use glb_common::{Error, Result};

use crate::report::SignalReport;

/// sendMessage / getMe timeout
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(20);

/// sendDocument timeout
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Caption attached to the report file
const REPORT_CAPTION: &str = "GLB daily report";

/// Text of the diagnostic message
pub const CHECK_MESSAGE: &str = "GLB scanner test message - ignore";

/// Longest response excerpt kept in errors and logs
const MAX_ERROR_CHARS: usize = 400;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Bot identity returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

// ============================================================================
// Telegram Notifier
// ============================================================================

/// Bot API client bound to one chat.
pub struct TelegramNotifier {
    api_base: String,
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, chat_id: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Fails with a configuration error when the token or chat id is missing.
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let (token, chat_id) = config.credentials()?;
        Ok(Self::new(&config.api_base, token, chat_id))
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Send an HTML-formatted message.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .timeout(MESSAGE_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("sendMessage", e))?;

        read_response::<serde_json::Value>("sendMessage", response).await?;
        Ok(())
    }

    /// Upload a file as a document.
    pub async fn send_document(&self, file_path: &Path, caption: Option<&str>) -> Result<()> {
        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("report")
            .to_string();

        let file_bytes = tokio::fs::read(file_path).await?;
        let part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name);

        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", part);

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await
            .map_err(|e| request_error("sendDocument", e))?;

        read_response::<serde_json::Value>("sendDocument", response).await?;
        Ok(())
    }

    /// Identify the bot; validates the token.
    pub async fn get_me(&self) -> Result<BotInfo> {
        let response = self
            .client
            .get(self.api_url("getMe"))
            .timeout(MESSAGE_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error("getMe", e))?;

        read_response::<BotInfo>("getMe", response)
            .await?
            .ok_or_else(|| Error::Notification("getMe returned no result".into()))
    }
}

fn request_error(method: &str, e: reqwest::Error) -> Error {
    Error::Notification(format!(
        "Telegram {} request failed: {}",
        method,
        sanitize_for_log(&e.to_string())
    ))
}

async fn read_response<T: serde::de::DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<Option<T>> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| request_error(method, e))?;

    let parsed: Option<ApiResponse<T>> = serde_json::from_str(&text).ok();

    match parsed {
        Some(body) if status.is_success() && body.ok => Ok(body.result),
        Some(body) => Err(Error::Notification(format!(
            "Telegram {} failed (HTTP {}): {}",
            method,
            status.as_u16(),
            body.description.unwrap_or_default()
        ))),
        None => Err(Error::Notification(format!(
            "Telegram {} failed (HTTP {}): {}",
            method,
            status.as_u16(),
            truncate_with_ellipsis(&sanitize_for_log(&text), MAX_ERROR_CHARS)
        ))),
    }
}

// ============================================================================
// Report Notification
// ============================================================================

/// What the notify step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No config file or no telegram section
    NotConfigured,
    /// Nothing to report and `send_only_if_breakouts` is set
    Skipped,
    /// Message (and file when requested) attempted
    Sent { message: bool, file: Option<bool> },
}

/// Push a report summary and optionally the report file.
///
/// Missing config is a silent no-op; a telegram section without credentials
/// is a configuration error. Delivery failures are logged and reflected in
/// the outcome, not returned as errors.
pub async fn notify_report(
    config: Option<&NotifyConfig>,
    report: &SignalReport,
    report_file: Option<&Path>,
) -> Result<NotifyOutcome> {
    let Some(telegram) = config.and_then(|c| c.telegram.as_ref()) else {
        info!("No telegram notification config found, finishing without sending");
        return Ok(NotifyOutcome::NotConfigured);
    };

    let notifier = TelegramNotifier::from_config(telegram)?;

    if telegram.send_only_if_breakouts && !report.has_breakouts() {
        info!("No breakouts and send_only_if_breakouts is set, skipping send");
        return Ok(NotifyOutcome::Skipped);
    }

    let message = match notifier.send_message(&report.telegram_text()).await {
        Ok(()) => {
            info!(chat_id = %notifier.chat_id(), "Telegram message sent");
            true
        }
        Err(e) => {
            warn!(error = %e, "Telegram message failed");
            false
        }
    };

    let file = match report_file.filter(|_| telegram.send_file) {
        Some(path) if path.exists() => {
            match notifier.send_document(path, Some(REPORT_CAPTION)).await {
                Ok(()) => {
                    info!(file = %path.display(), "Telegram report file sent");
                    Some(true)
                }
                Err(e) => {
                    warn!(error = %e, "Telegram report file failed");
                    Some(false)
                }
            }
        }
        Some(path) => {
            warn!(file = %path.display(), "Report file missing, not attached");
            Some(false)
        }
        None => None,
    };

    Ok(NotifyOutcome::Sent { message, file })
}

/// Diagnostic: identify the bot, then send a test message to the chat.
pub async fn check_telegram(config: &TelegramConfig) -> Result<BotInfo> {
    let notifier = TelegramNotifier::from_config(config)?;
    info!(chat_id = %notifier.chat_id(), "Calling getMe...");

    let bot = notifier.get_me().await?;
    info!(
        bot_id = bot.id,
        username = bot.username.as_deref().unwrap_or(""),
        name = %bot.first_name,
        "Bot token accepted"
    );

    info!("Sending test message...");
    notifier.send_message(CHECK_MESSAGE).await?;
    info!("Test message sent");

    Ok(bot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let notifier = TelegramNotifier::new("https://api.telegram.org/", "123:abc", "42");
        assert_eq!(
            notifier.api_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let config = TelegramConfig {
            bot_token: Some("123:abc".into()),
            chat_id: None,
            ..Default::default()
        };
        let err = TelegramNotifier::from_config(&config).err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_notify_without_config_is_noop() {
        let report = SignalReport::new(Vec::new(), "stamp");
        let outcome = notify_report(None, &report, None).await.unwrap();
        assert_eq!(outcome, NotifyOutcome::NotConfigured);

        let empty = NotifyConfig::default();
        let outcome = notify_report(Some(&empty), &report, None).await.unwrap();
        assert_eq!(outcome, NotifyOutcome::NotConfigured);
    }

    #[tokio::test]
    async fn test_notify_missing_token_is_configuration_error() {
        let config = NotifyConfig {
            telegram: Some(TelegramConfig {
                chat_id: Some("42".into()),
                ..Default::default()
            }),
        };
        let report = SignalReport::new(Vec::new(), "stamp");
        let err = notify_report(Some(&config), &report, None).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_notify_skips_without_breakouts() {
        let config = NotifyConfig {
            telegram: Some(TelegramConfig {
                bot_token: Some("123:abc".into()),
                chat_id: Some("42".into()),
                ..Default::default()
            }),
        };
        let report = SignalReport::new(Vec::new(), "stamp");
        let outcome = notify_report(Some(&config), &report, None).await.unwrap();
        assert_eq!(outcome, NotifyOutcome::Skipped);
    }
}
