//! JSON-over-HTTP channel adapter.
//!
//! Discord webhooks, Slack `chat.postMessage`, Pushbullet pushes and
//! Facebook page posts all take a JSON body at a fixed URL and differ only
//! in endpoint and authentication, so one adapter covers them.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

use crate::payload::ChannelPayload;
use crate::registry::ChannelType;
use crate::traits::{ChannelAdapter, NotifyError};

const SLACK_POST_MESSAGE: &str = "https://slack.com/api/chat.postMessage";
const PUSHBULLET_PUSHES: &str = "https://api.pushbullet.com/v2/pushes";
const FACEBOOK_FEED: &str = "https://graph.facebook.com/v2.9/me/feed";

/// Delay used when a 429 response does not say how long to wait.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Delivers payloads as JSON to a configured endpoint.
#[derive(Debug)]
pub struct WebhookAdapter {
    channel: ChannelType,
    url: String,
    method: reqwest::Method,
    /// Custom headers to include on every request.
    headers: HashMap<String, String>,
    /// The service answers 200 with `{"ok": false, "error": ...}` on failure.
    check_ok_field: bool,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookAdapter {
    pub fn new(channel: ChannelType, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            channel,
            url: url.into(),
            method: reqwest::Method::POST,
            headers: HashMap::new(),
            check_ok_field: false,
            client,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_method(mut self, method: reqwest::Method) -> Self {
        self.method = method;
        self
    }

    pub fn discord(webhook_url: &str, client: reqwest::Client) -> Self {
        Self::new(ChannelType::Discord, webhook_url, client)
    }

    pub fn slack(api_key: &str, client: reqwest::Client) -> Self {
        let mut adapter = Self::new(ChannelType::Slack, SLACK_POST_MESSAGE, client)
            .with_header("Authorization", format!("Bearer {}", api_key));
        adapter.check_ok_field = true;
        adapter
    }

    pub fn pushbullet(api_key: &str, client: reqwest::Client) -> Self {
        Self::new(ChannelType::Pushbullet, PUSHBULLET_PUSHES, client).with_header("Access-Token", api_key)
    }

    pub fn facebook_page(page_access_token: &str, client: reqwest::Client) -> Self {
        let url = format!("{}?access_token={}", FACEBOOK_FEED, page_access_token);
        Self::new(ChannelType::FacebookPage, url, client)
    }

    /// Endpoint with any access token query parameter masked.
    fn display_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

#[async_trait::async_trait]
impl ChannelAdapter for WebhookAdapter {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<(), NotifyError> {
        if payload.channel_type() != self.channel {
            return Err(NotifyError::Config(format!(
                "{} adapter cannot deliver a {} payload",
                self.channel,
                payload.channel_type()
            )));
        }

        let mut request = self.client.request(self.method.clone(), &self.url).json(payload);
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = retry_after(response.headers()).unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(NotifyError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(
                channel = %self.channel,
                url = %self.display_url(),
                %status,
                body = %body_text,
                "webhook returned non-2xx status"
            );
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: body_text,
            });
        }

        if self.check_ok_field {
            let text = response.text().await?;
            let body: serde_json::Value = serde_json::from_str(&text).map_err(|_| NotifyError::Rejected {
                status: status.as_u16(),
                body: text.clone(),
            })?;
            check_ok(status, &body)?;
        }

        tracing::debug!(
            channel = %self.channel,
            url = %self.display_url(),
            method = %self.method,
            %status,
            "webhook notification delivered"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        self.channel.as_str()
    }
}

/// Interpret an `{"ok": bool, "error": ...}` response body.
pub(crate) fn check_ok(status: StatusCode, body: &serde_json::Value) -> Result<(), NotifyError> {
    if body.get("ok") == Some(&serde_json::Value::Bool(true)) {
        return Ok(());
    }
    let description = body
        .get("error")
        .or_else(|| body.get("description"))
        .and_then(|v| v.as_str())
        .unwrap_or("unknown API error");
    Err(NotifyError::Rejected {
        status: status.as_u16(),
        body: description.to_string(),
    })
}

/// Whole seconds from a `Retry-After` header, rounding fractions up.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<u64> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = raw.trim().parse().ok()?;
    (secs >= 0.0).then(|| secs.ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{DiscordEmbed, DiscordPayload, SlackAttachment, SlackPayload};
    use crate::testing::{http_response, serve_once};
    use reqwest::header::HeaderValue;

    fn client() -> reqwest::Client {
        reqwest::Client::new()
    }

    #[test]
    fn slack_uses_bearer_token_and_ok_field() {
        let adapter = WebhookAdapter::slack("xoxb-1", client());
        assert_eq!(adapter.url, SLACK_POST_MESSAGE);
        assert_eq!(adapter.headers["Authorization"], "Bearer xoxb-1");
        assert!(adapter.check_ok_field);
        assert_eq!(adapter.channel_name(), "slack");
    }

    #[test]
    fn pushbullet_sets_access_token_header() {
        let adapter = WebhookAdapter::pushbullet("pb-key", client());
        assert_eq!(adapter.headers["Access-Token"], "pb-key");
        assert!(!adapter.check_ok_field);
    }

    #[test]
    fn facebook_token_is_masked_in_logs() {
        let adapter = WebhookAdapter::facebook_page("SECRET", client());
        assert!(adapter.url.ends_with("access_token=SECRET"));
        assert_eq!(adapter.display_url(), FACEBOOK_FEED);
    }

    #[test]
    fn discord_posts_to_webhook_url() {
        let adapter = WebhookAdapter::discord("https://discord.example/api/webhooks/1/abc", client());
        assert_eq!(adapter.method, reqwest::Method::POST);
        assert_eq!(adapter.channel_name(), "discord");
        let adapter = adapter.with_method(reqwest::Method::PUT);
        assert_eq!(adapter.method, reqwest::Method::PUT);
    }

    #[tokio::test]
    async fn mismatched_payload_is_config_error() {
        let adapter = WebhookAdapter::discord("https://discord.example/hook", client());
        let payload = ChannelPayload::Twitter(crate::payload::TwitterPayload {
            status: "hi".into(),
        });
        let err = adapter.deliver(&payload).await.unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn ok_field_interpretation() {
        assert!(check_ok(StatusCode::OK, &serde_json::json!({"ok": true})).is_ok());
        let err = check_ok(StatusCode::OK, &serde_json::json!({"ok": false, "error": "channel_not_found"}))
            .unwrap_err();
        assert!(err.to_string().contains("channel_not_found"));
    }

    fn discord_payload() -> ChannelPayload {
        ChannelPayload::Discord(DiscordPayload {
            username: None,
            avatar_url: None,
            embeds: vec![DiscordEmbed {
                title: Some("A wild Dratini has appeared!".into()),
                url: None,
                description: None,
                color: None,
                thumbnail: None,
                image: None,
            }],
        })
    }

    fn slack_payload() -> ChannelPayload {
        ChannelPayload::Slack(SlackPayload {
            channel: "general".into(),
            username: None,
            icon_url: None,
            attachments: vec![SlackAttachment {
                title: Some("Raid!".into()),
                title_link: None,
                text: None,
                color: None,
                thumb_url: None,
                image_url: None,
            }],
        })
    }

    fn slack_at(base_url: &str) -> WebhookAdapter {
        let mut adapter = WebhookAdapter::new(ChannelType::Slack, format!("{}/api/chat.postMessage", base_url), client())
            .with_header("Authorization", "Bearer xoxb-1");
        adapter.check_ok_field = true;
        adapter
    }

    #[tokio::test]
    async fn discord_delivery_posts_json() {
        let (base, server) = serve_once(http_response("204 No Content", &[], "")).await;
        let adapter = WebhookAdapter::discord(&format!("{}/api/webhooks/1/abc", base), client());
        adapter.deliver(&discord_payload()).await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /api/webhooks/1/abc HTTP/1.1"));
        assert!(request.contains(r#""embeds":[{"title":"A wild Dratini has appeared!"}]"#));
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let (base, server) = serve_once(http_response("429 Too Many Requests", &[("Retry-After", "7")], "")).await;
        let adapter = WebhookAdapter::discord(&format!("{}/hook", base), client());
        let err = adapter.deliver(&discord_payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::RateLimited { retry_after_secs: 7 }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_rejected_with_body() {
        let (base, server) = serve_once(http_response("400 Bad Request", &[], "invalid embed")).await;
        let adapter = WebhookAdapter::discord(&format!("{}/hook", base), client());
        let err = adapter.deliver(&discord_payload()).await.unwrap_err();
        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid embed");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let (base, server) = serve_once(http_response("503 Service Unavailable", &[], "<html>busy</html>")).await;
        let adapter = WebhookAdapter::discord(&format!("{}/hook", base), client());
        let err = adapter.deliver(&discord_payload()).await.unwrap_err();
        assert!(err.is_retryable(), "{err}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn slack_ok_false_is_rejected() {
        let (base, server) = serve_once(http_response(
            "200 OK",
            &[("Content-Type", "application/json")],
            r#"{"ok":false,"error":"channel_not_found"}"#,
        ))
        .await;
        let err = slack_at(&base).deliver(&slack_payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 200, ref body } if body == "channel_not_found"));

        let request = server.await.unwrap().to_lowercase();
        assert!(request.contains("authorization: bearer xoxb-1"));
    }

    #[tokio::test]
    async fn slack_ok_true_is_delivered() {
        let (base, server) = serve_once(http_response("200 OK", &[], r#"{"ok":true,"ts":"1.2"}"#)).await;
        slack_at(&base).deliver(&slack_payload()).await.unwrap();
        let request = server.await.unwrap();
        assert!(request.contains(r#""channel":"general""#));
    }

    #[tokio::test]
    async fn slack_non_json_body_is_rejected() {
        let (base, server) = serve_once(http_response("200 OK", &[], "<html>maintenance</html>")).await;
        let err = slack_at(&base).deliver(&slack_payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 200, ref body } if body.contains("maintenance")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_error_does_not_expose_webhook_token() {
        let adapter = WebhookAdapter::discord("http://127.0.0.1:1/api/webhooks/1/SECRETTOKEN", client());
        let err = adapter.deliver(&discord_payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Http(_)));
        assert!(!err.to_string().contains("SECRETTOKEN"), "{err}");
        assert!(!format!("{err:?}").contains("SECRETTOKEN"));
    }

    #[test]
    fn retry_after_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(retry_after(&headers), Some(12));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("0.25"));
        assert_eq!(retry_after(&headers), Some(1));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(retry_after(&headers), None);
    }
}
