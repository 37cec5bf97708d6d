//! Alarm registry: loads, validates and compiles the alarms configuration.
//!
//! The alarms file is a list of alarm objects:
//!
//! ```json
//! [
//!   {
//!     "active": "True",
//!     "type": "discord",
//!     "webhook_url": "${DISCORD_WEBHOOK}",
//!     "pokemon": { "title": "<pkmn>[ <iv>%]", "map": { "zoom": "14" } }
//!   }
//! ]
//! ```
//!
//! Everything is validated up front. Once loaded the registry is immutable
//! and shared behind an `Arc` by concurrent dispatches.

mod category;
mod channel;
pub(crate) mod defaults;
mod ingest;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use alarmist_core::CategoryKind;
use serde::Serialize;
use serde_json::Value;

pub use category::CategoryTemplate;
pub use channel::{Channel, ChannelType};

use crate::suggest::{did_you_mean, suggestion};
use crate::template::CompileError;
use crate::vocabulary::Vocabulary;

/// Errors raised while loading the alarms configuration.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("alarms configuration must be a list of alarm objects")]
    NotAList,

    #[error("{location}: expected an object")]
    NotAnObject { location: String },

    #[error("{location}: missing required key '{key}'")]
    MissingKey { location: String, key: String },

    #[error("{location}: unknown channel type '{value}'{}", did_you_mean(.suggestion))]
    UnknownChannel {
        location: String,
        value: String,
        suggestion: Option<String>,
    },

    #[error("{location}: unknown key '{key}'{}", did_you_mean(.suggestion))]
    UnknownKey {
        location: String,
        key: String,
        suggestion: Option<String>,
    },

    #[error("{location}: '{key}' must be a boolean flag, got {value}")]
    InvalidFlag {
        location: String,
        key: String,
        value: String,
    },

    #[error("{location}: invalid value for '{key}': {reason}")]
    InvalidValue {
        location: String,
        key: String,
        reason: String,
    },

    #[error("{location}: {field} template: {source}")]
    Template {
        location: String,
        field: String,
        #[source]
        source: CompileError,
    },

    #[error("{location}: credential '{key}': {reason}")]
    Credential {
        location: String,
        key: String,
        reason: String,
    },

    #[error("placeholder overrides: {0}")]
    Overrides(String),
}

/// Position of an alarm in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AlarmId(pub usize);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One configured destination.
#[derive(Debug, Clone)]
pub struct AlarmConfig {
    pub id: AlarmId,
    pub name: Option<String>,
    pub active: bool,
    pub channel: Channel,
    pub startup_message: bool,
    pub categories: BTreeMap<CategoryKind, CategoryTemplate>,
}

impl AlarmConfig {
    pub fn channel_type(&self) -> ChannelType {
        self.channel.channel_type()
    }

    pub fn template_for(&self, category: CategoryKind) -> Option<&CategoryTemplate> {
        self.categories.get(&category)
    }

    /// Name for logs: the configured name, else channel and position.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", self.channel_type(), self.id),
        }
    }
}

/// What to do with an alarm entry that fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Refuse the whole configuration.
    #[default]
    Strict,
    /// Drop the entry, log a warning and keep loading.
    SkipInvalid,
}

/// An entry dropped under [`LoadPolicy::SkipInvalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedAlarm {
    pub id: AlarmId,
    pub reason: String,
}

/// The validated, compiled set of alarms.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    alarms: Vec<AlarmConfig>,
    skipped: Vec<SkippedAlarm>,
}

const ALARM_KEYS: &[&str] = &["active", "type", "name", "startup_message"];

impl Registry {
    /// Validate and compile an already-parsed configuration document.
    pub fn load(doc: &Value, vocabulary: &Vocabulary, policy: LoadPolicy) -> Result<Self, ValidationError> {
        let entries = doc.as_array().ok_or(ValidationError::NotAList)?;
        let mut registry = Registry::default();

        for (index, entry) in entries.iter().enumerate() {
            let id = AlarmId(index);
            match parse_alarm(id, entry, vocabulary) {
                Ok(alarm) => {
                    tracing::debug!(
                        alarm_id = %id,
                        channel = %alarm.channel_type(),
                        active = alarm.active,
                        categories = alarm.categories.len(),
                        "alarm loaded"
                    );
                    registry.alarms.push(alarm);
                }
                Err(e) if policy == LoadPolicy::SkipInvalid => {
                    tracing::warn!(alarm_id = %id, error = %e, "skipping invalid alarm");
                    registry.skipped.push(SkippedAlarm {
                        id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let active = registry.alarms.iter().filter(|a| a.active).count();
        tracing::info!(
            total = registry.alarms.len(),
            active,
            skipped = registry.skipped.len(),
            "alarm registry loaded"
        );
        Ok(registry)
    }

    /// Read and load a `.json`, `.yml` or `.yaml` alarms file.
    pub fn from_path(path: &Path, vocabulary: &Vocabulary, policy: LoadPolicy) -> Result<Self, ValidationError> {
        let doc = read_document(path)?;
        Self::load(&doc, vocabulary, policy)
    }

    /// All loaded alarms, in configuration order.
    pub fn alarms(&self) -> &[AlarmConfig] {
        &self.alarms
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmConfig> {
        self.alarms.iter().find(|a| a.id == id)
    }

    /// Active alarms with a template for `category`, in configuration order.
    pub fn active_alarms_for(&self, category: CategoryKind) -> Vec<&AlarmConfig> {
        self.alarms
            .iter()
            .filter(|a| a.active && a.categories.contains_key(&category))
            .collect()
    }

    pub fn skipped(&self) -> &[SkippedAlarm] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

/// Read a JSON or YAML document. The format is chosen by file extension;
/// anything other than `.yml`/`.yaml` is parsed as JSON.
pub fn read_document(path: &Path) -> Result<Value, ValidationError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&raw)?)
    } else {
        Ok(serde_json::from_str(&raw)?)
    }
}

fn parse_alarm(id: AlarmId, entry: &Value, vocabulary: &Vocabulary) -> Result<AlarmConfig, ValidationError> {
    let location = format!("alarm {}", id);
    let obj = ingest::object(entry, &location)?;

    let type_value = obj.get("type").ok_or_else(|| ValidationError::MissingKey {
        location: location.clone(),
        key: "type".to_string(),
    })?;
    let type_name = ingest::text(type_value, &location, "type")?;
    let channel_type = ChannelType::from_name(&type_name).ok_or_else(|| ValidationError::UnknownChannel {
        location: location.clone(),
        suggestion: suggestion(&type_name, &ChannelType::names()),
        value: type_name.clone(),
    })?;
    let location = format!("alarm {} ({})", id, channel_type);

    let mut allowed: Vec<&str> = ALARM_KEYS.to_vec();
    allowed.extend(CategoryKind::ALL.iter().map(CategoryKind::as_str));
    allowed.extend_from_slice(channel_type.required_keys());
    allowed.extend_from_slice(channel_type.optional_keys());
    ingest::reject_unknown_keys(obj, &allowed, &location)?;

    let active_value = obj.get("active").ok_or_else(|| ValidationError::MissingKey {
        location: location.clone(),
        key: "active".to_string(),
    })?;
    let active = ingest::flag(active_value, &location, "active")?;

    let name = obj
        .get("name")
        .map(|v| ingest::text(v, &location, "name"))
        .transpose()?;
    let startup_message = obj
        .get("startup_message")
        .map(|v| ingest::flag(v, &location, "startup_message"))
        .transpose()?
        .unwrap_or(true);

    let mut credentials = std::collections::HashMap::new();
    for &key in channel_type.required_keys().iter().chain(channel_type.optional_keys()) {
        if let Some(v) = obj.get(key) {
            credentials.insert(key.to_string(), ingest::text(v, &location, key)?);
        }
    }
    let channel = Channel::from_credentials(channel_type, credentials, &location)?;

    let mut categories = BTreeMap::new();
    for kind in CategoryKind::ALL {
        let set = vocabulary.for_category(kind);
        let block_location = format!("{} / {}", location, kind);
        let template = match obj.get(kind.as_str()) {
            Some(block) => CategoryTemplate::parse(block, channel_type, set, &block_location)?,
            None => match defaults::default_template(channel_type, kind) {
                Some(default) => CategoryTemplate::from_default(default, set, &block_location)?,
                None => continue,
            },
        };
        categories.insert(kind, template);
    }

    Ok(AlarmConfig {
        id,
        name,
        active,
        channel,
        startup_message,
        categories,
    })
}
