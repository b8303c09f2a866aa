// # Discord Webhook Sink
//
// This crate provides a `NotificationSink` that posts messages to a Discord
// webhook.
//
// ## Behavior
//
// - One POST per message: `{"content": "<message>"}`
// - Success is HTTP 204 (Discord's "no content"); any other status is a failure
// - Messages longer than Discord's 2000-character limit are truncated
// - No retries; a failure is returned to the caller once
//
// ## Security Requirements
//
// The webhook URL embeds its own credential and NEVER appears in logs or
// `Debug` output.

use async_trait::async_trait;
use banwatch_core::{Error, NotificationSink, Result};
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// Default HTTP timeout for webhook requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum message length Discord accepts, in characters
pub const MAX_CONTENT_CHARS: usize = 2000;

const ELLIPSIS: char = '…';

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Discord webhook sink
///
/// # Security
///
/// The Debug implementation does NOT expose the webhook URL.
pub struct DiscordWebhookSink {
    /// ⚠️ Contains the webhook token; never log this value
    webhook_url: String,

    client: reqwest::Client,
}

impl std::fmt::Debug for DiscordWebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordWebhookSink")
            .field("webhook_url", &"<REDACTED>")
            .finish()
    }
}

impl DiscordWebhookSink {
    /// Create a sink with the default timeout
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(webhook_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a sink with a custom per-request timeout
    ///
    /// # Errors
    ///
    /// - `Error::Config`: empty or non-HTTP(S) URL
    /// - `Error::Http`: the HTTP client could not be built
    pub fn with_timeout(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let webhook_url = webhook_url.into();
        if webhook_url.trim().is_empty() {
            return Err(Error::config("Webhook URL cannot be empty"));
        }
        if !webhook_url.starts_with("https://") && !webhook_url.starts_with("http://") {
            return Err(Error::config("Webhook URL must use HTTP or HTTPS"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

/// Cut `content` to Discord's limit, ending in an ellipsis when shortened
///
/// Counts characters, not bytes, so multi-byte text is never split.
pub fn truncate_content(content: &str) -> std::borrow::Cow<'_, str> {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        None => std::borrow::Cow::Borrowed(content),
        Some(_) => {
            let mut truncated: String = content.chars().take(MAX_CONTENT_CHARS - 1).collect();
            truncated.push(ELLIPSIS);
            std::borrow::Cow::Owned(truncated)
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordWebhookSink {
    async fn deliver(&self, content: &str) -> Result<()> {
        let content = truncate_content(content);
        if let std::borrow::Cow::Owned(_) = content {
            tracing::warn!(
                limit = MAX_CONTENT_CHARS,
                "Message exceeds Discord's length limit, truncated"
            );
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { content: &content })
            .send()
            .await
            .map_err(|e| {
                // reqwest errors may carry the URL; keep only the kind.
                Error::sink(format!(
                    "Webhook request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            tracing::debug!("Webhook accepted message");
            return Ok(());
        }

        let error = match status.as_u16() {
            429 => Error::sink(format!("Webhook rate limited. Status: {}", status)),
            401 | 403 | 404 => Error::sink(format!(
                "Webhook rejected, check DISCORD_WEBHOOK_URL. Status: {}",
                status
            )),
            500..=599 => Error::sink(format!("Discord server error (transient): {}", status)),
            _ => Error::sink(format!("Unexpected webhook status: {}", status)),
        };
        tracing::error!(status = status.as_u16(), "Webhook delivery failed");
        Err(error)
    }

    fn sink_name(&self) -> &'static str {
        "discord"
    }
}
