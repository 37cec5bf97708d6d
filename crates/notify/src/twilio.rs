//! Twilio SMS adapter.

use reqwest::StatusCode;

use crate::payload::ChannelPayload;
use crate::traits::{ChannelAdapter, NotifyError};
use crate::webhook::retry_after;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

/// Sends SMS messages through the Twilio Messages resource (form POST,
/// HTTP basic auth).
#[derive(Debug)]
pub struct TwilioAdapter {
    account_sid: String,
    auth_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TwilioAdapter {
    pub fn new(account_sid: &str, auth_token: &str, client: reqwest::Client) -> Self {
        Self {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            api_base: TWILIO_API.to_string(),
            client,
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }
}

#[async_trait::async_trait]
impl ChannelAdapter for TwilioAdapter {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<(), NotifyError> {
        let ChannelPayload::Twilio(sms) = payload else {
            return Err(NotifyError::Config(format!(
                "twilio adapter cannot deliver a {} payload",
                payload.channel_type()
            )));
        };

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(sms)
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after(response.headers()).unwrap_or(30),
            });
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(to = %sms.to, %status, body = %body, "Twilio rejected message");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(to = %sms.to, "SMS sent");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "twilio"
    }
}
