//! Per-category message templates of one alarm.

use alarmist_core::{EventRecord, Fields};
use serde_json::Value;

use super::defaults::DefaultTemplate;
use super::{ingest, ChannelType, ValidationError};
use crate::map::MapOptions;
use crate::payload::{fit_tweet, RenderedMessage};
use crate::render::render;
use crate::template::Template;
use crate::vocabulary::PlaceholderSet;

/// Keys accepted inside a category block.
pub(crate) const BLOCK_KEYS: &[&str] = &[
    "username",
    "icon_url",
    "avatar_url",
    "title",
    "url",
    "body",
    "color",
    "map",
];

/// Twitter blocks may name the tweet text `status` instead of `body`.
const TWITTER_BLOCK_KEYS: &[&str] = &[
    "username",
    "icon_url",
    "avatar_url",
    "title",
    "url",
    "body",
    "status",
    "color",
    "map",
];

fn block_keys(channel: ChannelType) -> &'static [&'static str] {
    match channel {
        ChannelType::Twitter => TWITTER_BLOCK_KEYS,
        _ => BLOCK_KEYS,
    }
}

/// Compiled templates for one (alarm, category) pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryTemplate {
    pub username: Option<Template>,
    pub icon_url: Option<Template>,
    pub avatar_url: Option<Template>,
    pub title: Option<Template>,
    pub url: Option<Template>,
    pub body: Option<Template>,
    pub color: Option<Template>,
    pub map: MapOptions,
}

impl CategoryTemplate {
    /// Parse and compile a configured category block.
    pub(crate) fn parse(
        value: &Value,
        channel: ChannelType,
        set: &PlaceholderSet,
        location: &str,
    ) -> Result<Self, ValidationError> {
        let obj = ingest::object(value, location)?;
        ingest::reject_unknown_keys(obj, block_keys(channel), location)?;

        let field = |key: &str| -> Result<Option<Template>, ValidationError> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(None),
                Some(v) => {
                    let raw = ingest::text(v, location, key)?;
                    compile(&raw, set, location, key).map(Some)
                }
            }
        };

        let body_key = if obj.contains_key("status") {
            if obj.contains_key("body") {
                return Err(ValidationError::InvalidValue {
                    location: location.to_string(),
                    key: "status".to_string(),
                    reason: "give the tweet text as either 'body' or 'status', not both".to_string(),
                });
            }
            "status"
        } else {
            "body"
        };

        let map = match obj.get("map") {
            Some(v) => ingest::map_options(v, &format!("{} / map", location))?,
            None => MapOptions::default(),
        };

        Ok(Self {
            username: field("username")?,
            icon_url: field("icon_url")?,
            avatar_url: field("avatar_url")?,
            title: field("title")?,
            url: field("url")?,
            body: field(body_key)?,
            color: field("color")?,
            map,
        })
    }

    /// Compile a built-in default.
    pub(crate) fn from_default(
        default: DefaultTemplate,
        set: &PlaceholderSet,
        location: &str,
    ) -> Result<Self, ValidationError> {
        let opt = |raw: Option<&str>, key: &str| raw.map(|r| compile(r, set, location, key)).transpose();
        Ok(Self {
            title: opt(default.title, "title")?,
            url: opt(default.url, "url")?,
            body: Some(compile(default.body, set, location, "body")?),
            ..Self::default()
        })
    }

    /// Render every populated field for `event`. Fields that render empty
    /// are left out. Map data is filled in by the dispatcher.
    pub fn render(&self, channel: ChannelType, event: &EventRecord) -> RenderedMessage {
        let fields = &event.fields;
        let body = match (&self.body, channel) {
            (Some(t), ChannelType::Twitter) => non_empty(fit_tweet(t, fields)),
            (t, _) => render_opt(t, fields),
        };
        RenderedMessage {
            username: render_opt(&self.username, fields),
            icon_url: render_opt(&self.icon_url, fields),
            avatar_url: render_opt(&self.avatar_url, fields),
            title: render_opt(&self.title, fields),
            url: render_opt(&self.url, fields),
            body,
            color: render_opt(&self.color, fields),
            map: None,
            map_url: None,
        }
    }
}

fn compile(raw: &str, set: &PlaceholderSet, location: &str, key: &str) -> Result<Template, ValidationError> {
    Template::compile(raw, set).map_err(|source| ValidationError::Template {
        location: location.to_string(),
        field: key.to_string(),
        source,
    })
}

fn render_opt(template: &Option<Template>, fields: &Fields) -> Option<String> {
    template.as_ref().and_then(|t| non_empty(render(t, fields)))
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
