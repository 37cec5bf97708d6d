//! Telegram Bot API adapter.
//!
//! Delivers payloads via the Bot API `sendMessage` endpoint and maps its
//! rate limit responses onto [`NotifyError::RateLimited`].

use crate::payload::ChannelPayload;
use crate::traits::{ChannelAdapter, NotifyError};
use crate::webhook::retry_after;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Sends messages via the Telegram Bot API.
#[derive(Debug)]
pub struct TelegramAdapter {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramAdapter {
    /// Returns [`NotifyError::Config`] if the token is empty.
    pub fn new(bot_token: &str, client: reqwest::Client) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() {
            return Err(NotifyError::Config(
                "Telegram bot token must not be empty".to_string(),
            ));
        }
        Ok(Self {
            bot_token: bot_token.to_string(),
            api_base: TELEGRAM_API.to_string(),
            client,
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait::async_trait]
impl ChannelAdapter for TelegramAdapter {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<(), NotifyError> {
        let ChannelPayload::Telegram(message) = payload else {
            return Err(NotifyError::Config(format!(
                "telegram adapter cannot deliver a {} payload",
                payload.channel_type()
            )));
        };

        tracing::debug!(chat_id = %message.chat_id, "Sending Telegram notification");

        let response = self.client.post(self.send_message_url()).json(message).send().await?;

        let status = response.status();
        let header_retry_after = retry_after(response.headers());
        let text = response.text().await?;

        let Ok(resp_body) = serde_json::from_str::<serde_json::Value>(&text) else {
            tracing::warn!(%status, body = %text, "Telegram returned a non-JSON response");
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(NotifyError::RateLimited {
                    retry_after_secs: header_retry_after.unwrap_or(30),
                });
            }
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        };

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            tracing::info!(chat_id = %message.chat_id, "Telegram notification sent");
            return Ok(());
        }

        // Handle rate limiting (HTTP 429).
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp_body
                .get("parameters")
                .and_then(|p| p.get("retry_after"))
                .and_then(|v| v.as_u64())
                .or(header_retry_after)
                .unwrap_or(30);
            return Err(NotifyError::RateLimited { retry_after_secs });
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error");

        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body: description.to_string(),
        })
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}
