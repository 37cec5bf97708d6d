//! Channel types and their typed credentials.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// The closed set of supported messaging services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Discord,
    Slack,
    Telegram,
    Twitter,
    Pushbullet,
    Twilio,
    FacebookPage,
}

impl ChannelType {
    pub const ALL: [ChannelType; 7] = [
        ChannelType::Discord,
        ChannelType::Slack,
        ChannelType::Telegram,
        ChannelType::Twitter,
        ChannelType::Pushbullet,
        ChannelType::Twilio,
        ChannelType::FacebookPage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Discord => "discord",
            ChannelType::Slack => "slack",
            ChannelType::Telegram => "telegram",
            ChannelType::Twitter => "twitter",
            ChannelType::Pushbullet => "pushbullet",
            ChannelType::Twilio => "twilio",
            ChannelType::FacebookPage => "facebook_page",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(ChannelType::as_str).collect()
    }

    /// Credential keys that must be present in the alarm entry.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            ChannelType::Discord => &["webhook_url"],
            ChannelType::Slack => &["api_key"],
            ChannelType::Telegram => &["bot_token", "chat_id"],
            ChannelType::Twitter => &[
                "access_token",
                "access_secret",
                "consumer_key",
                "consumer_secret",
            ],
            ChannelType::Pushbullet => &["api_key"],
            ChannelType::Twilio => &["account_sid", "auth_token", "from_number", "to_number"],
            ChannelType::FacebookPage => &["page_access_token"],
        }
    }

    pub fn optional_keys(&self) -> &'static [&'static str] {
        match self {
            ChannelType::Slack | ChannelType::Pushbullet => &["channel"],
            _ => &[],
        }
    }

    /// Channels that show a title and link separately from the body.
    /// Plain-text channels get everything folded into the body.
    pub fn is_rich(&self) -> bool {
        matches!(
            self,
            ChannelType::Discord | ChannelType::Slack | ChannelType::Pushbullet | ChannelType::FacebookPage
        )
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DEFAULT_SLACK_CHANNEL: &str = "general";

/// A configured destination with its credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Channel {
    Discord {
        webhook_url: String,
    },
    Slack {
        api_key: String,
        channel: String,
    },
    Telegram {
        bot_token: String,
        chat_id: String,
    },
    Twitter {
        access_token: String,
        access_secret: String,
        consumer_key: String,
        consumer_secret: String,
    },
    Pushbullet {
        api_key: String,
        channel: Option<String>,
    },
    Twilio {
        account_sid: String,
        auth_token: String,
        from_number: String,
        to_number: String,
    },
    FacebookPage {
        page_access_token: String,
    },
}

impl Channel {
    pub fn channel_type(&self) -> ChannelType {
        match self {
            Channel::Discord { .. } => ChannelType::Discord,
            Channel::Slack { .. } => ChannelType::Slack,
            Channel::Telegram { .. } => ChannelType::Telegram,
            Channel::Twitter { .. } => ChannelType::Twitter,
            Channel::Pushbullet { .. } => ChannelType::Pushbullet,
            Channel::Twilio { .. } => ChannelType::Twilio,
            Channel::FacebookPage { .. } => ChannelType::FacebookPage,
        }
    }

    /// Build a channel from raw credential strings, resolving `${VAR}`
    /// references. Missing required keys are rejected.
    pub(crate) fn from_credentials(
        kind: ChannelType,
        mut creds: HashMap<String, String>,
        location: &str,
    ) -> Result<Self, ValidationError> {
        let mut take = |key: &str| -> Result<String, ValidationError> {
            let raw = creds.remove(key).ok_or_else(|| ValidationError::MissingKey {
                location: location.to_string(),
                key: key.to_string(),
            })?;
            resolve_credential(&raw, key, location)
        };

        let channel = match kind {
            ChannelType::Discord => Channel::Discord {
                webhook_url: take("webhook_url")?,
            },
            ChannelType::Slack => Channel::Slack {
                api_key: take("api_key")?,
                channel: match take("channel") {
                    Ok(c) => c.trim_start_matches('#').to_string(),
                    Err(ValidationError::MissingKey { .. }) => DEFAULT_SLACK_CHANNEL.to_string(),
                    Err(e) => return Err(e),
                },
            },
            ChannelType::Telegram => Channel::Telegram {
                bot_token: take("bot_token")?,
                chat_id: take("chat_id")?,
            },
            ChannelType::Twitter => Channel::Twitter {
                access_token: take("access_token")?,
                access_secret: take("access_secret")?,
                consumer_key: take("consumer_key")?,
                consumer_secret: take("consumer_secret")?,
            },
            ChannelType::Pushbullet => Channel::Pushbullet {
                api_key: take("api_key")?,
                channel: match take("channel") {
                    Ok(c) => Some(c),
                    Err(ValidationError::MissingKey { .. }) => None,
                    Err(e) => return Err(e),
                },
            },
            ChannelType::Twilio => Channel::Twilio {
                account_sid: take("account_sid")?,
                auth_token: take("auth_token")?,
                from_number: take("from_number")?,
                to_number: take("to_number")?,
            },
            ChannelType::FacebookPage => Channel::FacebookPage {
                page_access_token: take("page_access_token")?,
            },
        };
        Ok(channel)
    }
}

impl fmt::Debug for Channel {
    /// Credentials are redacted; only routing details are shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.channel_type().as_str());
        match self {
            Channel::Slack { channel, .. } => s.field("channel", channel),
            Channel::Telegram { chat_id, .. } => s.field("chat_id", chat_id),
            Channel::Pushbullet { channel, .. } => s.field("channel", channel),
            Channel::Twilio { to_number, .. } => s.field("to_number", to_number),
            _ => &mut s,
        };
        s.finish_non_exhaustive()
    }
}

fn resolve_credential(raw: &str, key: &str, location: &str) -> Result<String, ValidationError> {
    let value = resolve_env_vars(raw).map_err(|reason| ValidationError::Credential {
        location: location.to_string(),
        key: key.to_string(),
        reason,
    })?;
    if value.trim().is_empty() {
        return Err(ValidationError::Credential {
            location: location.to_string(),
            key: key.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(value)
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
///
/// Returns an error if a referenced variable is not set.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, String> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(format!("unclosed env var reference in: {input}"));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| format!("env var not found: {var_name}"))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn channel_names_round_trip() {
        for t in ChannelType::ALL {
            assert_eq!(ChannelType::from_name(t.as_str()), Some(t));
        }
        assert_eq!(ChannelType::from_name("Facebook_Page"), Some(ChannelType::FacebookPage));
        assert_eq!(ChannelType::from_name("email"), None);
    }

    #[test]
    fn discord_requires_webhook_url() {
        let err = Channel::from_credentials(ChannelType::Discord, creds(&[]), "alarm #0").unwrap_err();
        assert!(matches!(err, ValidationError::MissingKey { ref key, .. } if key == "webhook_url"));
    }

    #[test]
    fn slack_channel_defaults_to_general() {
        let ch = Channel::from_credentials(ChannelType::Slack, creds(&[("api_key", "xoxb")]), "a").unwrap();
        assert_eq!(
            ch,
            Channel::Slack {
                api_key: "xoxb".into(),
                channel: "general".into()
            }
        );
        let ch = Channel::from_credentials(
            ChannelType::Slack,
            creds(&[("api_key", "xoxb"), ("channel", "#raids")]),
            "a",
        )
        .unwrap();
        assert!(matches!(ch, Channel::Slack { ref channel, .. } if channel == "raids"));
    }

    #[test]
    fn twilio_requires_all_four_keys() {
        let err = Channel::from_credentials(
            ChannelType::Twilio,
            creds(&[("account_sid", "AC1"), ("auth_token", "t"), ("from_number", "+1")]),
            "a",
        )
        .unwrap_err();
        assert!(err.to_string().contains("to_number"));
    }

    #[test]
    fn credentials_resolve_env_vars() {
        std::env::set_var("ALARMIST_TEST_BOT_TOKEN", "123:abc");
        let ch = Channel::from_credentials(
            ChannelType::Telegram,
            creds(&[("bot_token", "${ALARMIST_TEST_BOT_TOKEN}"), ("chat_id", "-100")]),
            "a",
        )
        .unwrap();
        assert_eq!(
            ch,
            Channel::Telegram {
                bot_token: "123:abc".into(),
                chat_id: "-100".into()
            }
        );
        std::env::remove_var("ALARMIST_TEST_BOT_TOKEN");
    }

    #[test]
    fn missing_env_var_is_credential_error() {
        let err = Channel::from_credentials(
            ChannelType::FacebookPage,
            creds(&[("page_access_token", "${ALARMIST_SURELY_UNSET_VAR}")]),
            "a",
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::Credential { .. }));
    }

    #[test]
    fn resolve_env_vars_unclosed() {
        assert!(resolve_env_vars("https://x/${OOPS").is_err());
        assert_eq!(resolve_env_vars("no vars").unwrap(), "no vars");
    }

    #[test]
    fn debug_redacts_secrets() {
        let ch = Channel::Telegram {
            bot_token: "SECRET".into(),
            chat_id: "42".into(),
        };
        let printed = format!("{:?}", ch);
        assert!(printed.contains("42"));
        assert!(!printed.contains("SECRET"));
    }
}
