//! Channel-specific payload shapes.
//!
//! A [`RenderedMessage`] is channel-agnostic; [`build`] maps it onto the
//! JSON (or form) body each service expects. Pure: no I/O.

use alarmist_core::Fields;
use serde::Serialize;

use crate::color::{resolve_color, to_hex};
use crate::map::MapImageRequest;
use crate::registry::{Channel, ChannelType};
use crate::render::render;
use crate::template::Template;

/// Characters allowed in one status update.
pub const TWEET_LIMIT: usize = 140;
/// Length every link occupies after the service shortens it.
pub const SHORT_LINK_LEN: usize = 23;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("{channel} message has no text to send")]
    EmptyText { channel: ChannelType },
}

/// Concrete strings for one alarm and one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedMessage {
    pub username: Option<String>,
    pub icon_url: Option<String>,
    pub avatar_url: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub body: Option<String>,
    pub color: Option<String>,
    pub map: Option<MapImageRequest>,
    /// Image URL produced by the map renderer, if any.
    pub map_url: Option<String>,
}

impl RenderedMessage {
    /// Title and body joined on separate lines, for plain-text channels.
    pub fn text(&self) -> String {
        [self.title.as_deref(), self.body.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn color_value(&self) -> Option<u32> {
        self.color.as_deref().map(resolve_color)
    }
}

// ── Payload shapes ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub embeds: Vec<DiscordEmbed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscordEmbed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackPayload {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelegramPayload {
    pub chat_id: String,
    pub text: String,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwitterPayload {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushbulletPayload {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_tag: Option<String>,
}

/// Sent form-encoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwilioPayload {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body")]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacebookPagePayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// A payload ready for submission by a channel adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelPayload {
    Discord(DiscordPayload),
    Slack(SlackPayload),
    Telegram(TelegramPayload),
    Twitter(TwitterPayload),
    Pushbullet(PushbulletPayload),
    Twilio(TwilioPayload),
    FacebookPage(FacebookPagePayload),
}

impl ChannelPayload {
    pub fn channel_type(&self) -> ChannelType {
        match self {
            ChannelPayload::Discord(_) => ChannelType::Discord,
            ChannelPayload::Slack(_) => ChannelType::Slack,
            ChannelPayload::Telegram(_) => ChannelType::Telegram,
            ChannelPayload::Twitter(_) => ChannelType::Twitter,
            ChannelPayload::Pushbullet(_) => ChannelType::Pushbullet,
            ChannelPayload::Twilio(_) => ChannelType::Twilio,
            ChannelPayload::FacebookPage(_) => ChannelType::FacebookPage,
        }
    }
}

/// Shape `message` for `channel`.
pub fn build(channel: &Channel, message: &RenderedMessage) -> Result<ChannelPayload, PayloadError> {
    let channel_type = channel.channel_type();
    let require_text = |text: String| {
        if text.trim().is_empty() {
            Err(PayloadError::EmptyText { channel: channel_type })
        } else {
            Ok(text)
        }
    };

    let payload = match channel {
        Channel::Discord { .. } => {
            if message.title.is_none() && message.body.is_none() && message.map_url.is_none() {
                return Err(PayloadError::EmptyText { channel: channel_type });
            }
            ChannelPayload::Discord(DiscordPayload {
                username: message.username.clone(),
                avatar_url: message.avatar_url.clone(),
                embeds: vec![DiscordEmbed {
                    title: message.title.clone(),
                    url: message.url.clone(),
                    description: message.body.clone(),
                    color: message.color_value(),
                    thumbnail: message.icon_url.clone().map(|url| EmbedImage { url }),
                    image: message.map_url.clone().map(|url| EmbedImage { url }),
                }],
            })
        }
        Channel::Slack { channel, .. } => {
            if message.title.is_none() && message.body.is_none() {
                return Err(PayloadError::EmptyText { channel: channel_type });
            }
            ChannelPayload::Slack(SlackPayload {
                channel: channel.clone(),
                username: message.username.clone(),
                icon_url: message.icon_url.clone(),
                attachments: vec![SlackAttachment {
                    title: message.title.clone(),
                    title_link: message.url.clone(),
                    text: message.body.clone(),
                    color: message.color_value().map(to_hex),
                    thumb_url: message.avatar_url.clone(),
                    image_url: message.map_url.clone(),
                }],
            })
        }
        Channel::Telegram { chat_id, .. } => ChannelPayload::Telegram(TelegramPayload {
            chat_id: chat_id.clone(),
            text: require_text(message.text())?,
            disable_web_page_preview: message.map_url.is_none(),
        }),
        Channel::Twitter { .. } => ChannelPayload::Twitter(TwitterPayload {
            status: require_text(message.body.clone().unwrap_or_default())?,
        }),
        Channel::Pushbullet { channel, .. } => {
            if message.title.is_none() && message.body.is_none() {
                return Err(PayloadError::EmptyText { channel: channel_type });
            }
            ChannelPayload::Pushbullet(PushbulletPayload {
                kind: if message.url.is_some() { "link" } else { "note" },
                title: message.title.clone(),
                body: message.body.clone(),
                url: message.url.clone(),
                channel_tag: channel.clone(),
            })
        }
        Channel::Twilio {
            from_number,
            to_number,
            ..
        } => ChannelPayload::Twilio(TwilioPayload {
            from: from_number.clone(),
            to: to_number.clone(),
            body: require_text(message.text())?,
        }),
        Channel::FacebookPage { .. } => ChannelPayload::FacebookPage(FacebookPagePayload {
            message: require_text(message.text())?,
            link: message.url.clone(),
            name: message.title.clone(),
            picture: message.map_url.clone().or_else(|| message.icon_url.clone()),
        }),
    };
    Ok(payload)
}

/// Render a status update within [`TWEET_LIMIT`].
///
/// When the template ends with `<gmaps>`, the text before it is cut to
/// leave room for a shortened link and the link is appended whole.
pub fn fit_tweet(template: &Template, fields: &Fields) -> String {
    match template.split_trailing("gmaps") {
        Some((head, _)) => {
            let text = truncate_chars(&render(&head, fields), TWEET_LIMIT - SHORT_LINK_LEN);
            let link = fields.get("gmaps").map(|v| v.to_string()).unwrap_or_default();
            format!("{}{}", text, link)
        }
        None => truncate_chars(&render(template, fields), TWEET_LIMIT),
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
