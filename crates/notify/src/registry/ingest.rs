//! Normalization of loosely-typed configuration values.
//!
//! Alarm files spell flags as `"True"`/`"no"`/`true` and numbers as `14` or
//! `"14"`. Everything is coerced once here so the rest of the crate only
//! sees typed values.

use serde_json::{Map, Value};

use alarmist_core::config::parse_flag;

use super::ValidationError;
use crate::map::{MapOptions, MapType};
use crate::suggest::suggestion;

pub(crate) const MAP_KEYS: &[&str] = &["enabled", "width", "height", "maptype", "zoom"];

pub(crate) fn flag(value: &Value, location: &str, key: &str) -> Result<bool, ValidationError> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_flag(s),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::InvalidFlag {
        location: location.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub(crate) fn number(value: &Value, location: &str, key: &str) -> Result<u64, ValidationError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::InvalidValue {
        location: location.to_string(),
        key: key.to_string(),
        reason: format!("expected a non-negative integer, got {}", value),
    })
}

/// Strings pass through; numbers and booleans are stringified (chat ids and
/// phone numbers are often written unquoted).
pub(crate) fn text(value: &Value, location: &str, key: &str) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(ValidationError::InvalidValue {
            location: location.to_string(),
            key: key.to_string(),
            reason: format!("expected a string, got {}", value),
        }),
    }
}

pub(crate) fn object<'a>(value: &'a Value, location: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        location: location.to_string(),
    })
}

/// Reject any key of `obj` not listed in `allowed`.
pub(crate) fn reject_unknown_keys(
    obj: &Map<String, Value>,
    allowed: &[&str],
    location: &str,
) -> Result<(), ValidationError> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(ValidationError::UnknownKey {
            location: location.to_string(),
            key: key.clone(),
            suggestion: suggestion(key, allowed),
        }),
        None => Ok(()),
    }
}

fn bounded<T: TryFrom<u64>>(value: &Value, location: &str, key: &str, range: (u64, u64)) -> Result<T, ValidationError> {
    let n = number(value, location, key)?;
    if n < range.0 || n > range.1 {
        return Err(ValidationError::InvalidValue {
            location: location.to_string(),
            key: key.to_string(),
            reason: format!("must be between {} and {}, got {}", range.0, range.1, n),
        });
    }
    T::try_from(n).map_err(|_| ValidationError::InvalidValue {
        location: location.to_string(),
        key: key.to_string(),
        reason: format!("out of range: {}", n),
    })
}

/// Parse a `map` block. Absent keys keep their defaults.
pub(crate) fn map_options(value: &Value, location: &str) -> Result<MapOptions, ValidationError> {
    let obj = object(value, location)?;
    reject_unknown_keys(obj, MAP_KEYS, location)?;

    let mut options = MapOptions::default();
    if let Some(v) = obj.get("enabled") {
        options.enabled = flag(v, location, "enabled")?;
    }
    if let Some(v) = obj.get("width") {
        options.width = bounded(v, location, "width", (1, 2048))?;
    }
    if let Some(v) = obj.get("height") {
        options.height = bounded(v, location, "height", (1, 2048))?;
    }
    if let Some(v) = obj.get("zoom") {
        options.zoom = bounded(v, location, "zoom", (0, 21))?;
    }
    if let Some(v) = obj.get("maptype") {
        let raw = text(v, location, "maptype")?;
        options.map_type = raw.parse::<MapType>().map_err(|reason| ValidationError::InvalidValue {
            location: location.to_string(),
            key: "maptype".to_string(),
            reason: format!("{}{}", reason, crate::suggest::did_you_mean(&suggestion(&raw, &MapType::NAMES))),
        })?;
    }
    Ok(options)
}
