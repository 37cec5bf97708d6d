//! Builds the built-in HTTP adapters for a registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::{AlarmId, Channel, Registry};
use crate::retry::RetryingAdapter;
use crate::telegram::TelegramAdapter;
use crate::traits::{ChannelAdapter, NotifyError};
use crate::twilio::TwilioAdapter;
use crate::webhook::WebhookAdapter;

/// Adapter for one channel, or `Unsupported` when the channel needs an
/// injected adapter (Twitter requires OAuth1 request signing).
pub fn adapter_for(channel: &Channel, client: &reqwest::Client) -> Result<Arc<dyn ChannelAdapter>, NotifyError> {
    let client = client.clone();
    let adapter: Arc<dyn ChannelAdapter> = match channel {
        Channel::Discord { webhook_url } => Arc::new(WebhookAdapter::discord(webhook_url, client)),
        Channel::Slack { api_key, .. } => Arc::new(WebhookAdapter::slack(api_key, client)),
        Channel::Pushbullet { api_key, .. } => Arc::new(WebhookAdapter::pushbullet(api_key, client)),
        Channel::FacebookPage { page_access_token } => {
            Arc::new(WebhookAdapter::facebook_page(page_access_token, client))
        }
        Channel::Telegram { bot_token, .. } => Arc::new(TelegramAdapter::new(bot_token, client)?),
        Channel::Twilio {
            account_sid,
            auth_token,
            ..
        } => Arc::new(TwilioAdapter::new(account_sid, auth_token, client)),
        Channel::Twitter { .. } => {
            return Err(NotifyError::Unsupported(channel.channel_type().to_string()))
        }
    };
    Ok(adapter)
}

/// Adapters for every alarm of `registry`, each wrapped in a
/// [`RetryingAdapter`]. Alarms without a built-in adapter are left out
/// (with a warning) so the dispatcher reports them as failed.
pub fn http_adapters(
    registry: &Registry,
    timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
) -> Result<HashMap<AlarmId, Arc<dyn ChannelAdapter>>, NotifyError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let mut adapters = HashMap::new();
    for alarm in registry.alarms() {
        match adapter_for(&alarm.channel, &client) {
            Ok(inner) => {
                let adapter: Arc<dyn ChannelAdapter> = Arc::new(RetryingAdapter::new(inner, max_attempts, backoff));
                adapters.insert(alarm.id, adapter);
            }
            Err(e) => {
                tracing::warn!(alarm_id = %alarm.id, channel = %alarm.channel_type(), error = %e, "no adapter for alarm");
            }
        }
    }
    Ok(adapters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::LoadPolicy;
    use crate::vocabulary::Vocabulary;
    use serde_json::json;

    #[test]
    fn builds_adapters_for_supported_channels() {
        let doc = json!([
            {"active": "True", "type": "discord", "webhook_url": "https://d.example/hook"},
            {"active": "True", "type": "twitter", "access_token": "a", "access_secret": "b",
             "consumer_key": "c", "consumer_secret": "d"},
            {"active": "False", "type": "twilio", "account_sid": "AC", "auth_token": "t",
             "from_number": "+1", "to_number": "+2"}
        ]);
        let registry = Registry::load(&doc, &Vocabulary::builtin(), LoadPolicy::Strict).unwrap();
        let adapters = http_adapters(&registry, Duration::from_secs(5), 2, Duration::from_millis(10)).unwrap();

        assert_eq!(adapters.len(), 2);
        assert_eq!(adapters[&AlarmId(0)].channel_name(), "discord");
        assert!(!adapters.contains_key(&AlarmId(1)));
        assert_eq!(adapters[&AlarmId(2)].channel_name(), "twilio");
    }

    #[test]
    fn twitter_is_unsupported() {
        let channel = Channel::Twitter {
            access_token: "a".into(),
            access_secret: "b".into(),
            consumer_key: "c".into(),
            consumer_secret: "d".into(),
        };
        let err = adapter_for(&channel, &reqwest::Client::new()).err().unwrap();
        assert!(matches!(err, NotifyError::Unsupported(ref c) if c == "twitter"));
    }
}
