use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::category::CategoryKind;
use crate::error::CoreError;

/// Field name → value mapping carried by an event.
pub type Fields = HashMap<String, FieldValue>;

/// One detected occurrence handed to the dispatcher by the upstream pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub category: CategoryKind,
    #[serde(default)]
    pub fields: Fields,
}

impl EventRecord {
    pub fn new(category: CategoryKind) -> Self {
        Self {
            category,
            fields: HashMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|v| !v.is_empty())
    }

    /// Location of the event, read from the `lat` / `lng` fields.
    ///
    /// Returns `Ok(None)` when either field is absent.
    pub fn coordinates(&self) -> Result<Option<Coordinates>, CoreError> {
        let (Some(lat), Some(lng)) = (self.get("lat"), self.get("lng")) else {
            return Ok(None);
        };
        let lat = lat.as_f64().ok_or_else(|| CoreError::InvalidCoordinate {
            field: "lat",
            value: lat.to_string(),
        })?;
        let lng = lng.as_f64().ok_or_else(|| CoreError::InvalidCoordinate {
            field: "lng",
            value: lng.to_string(),
        })?;
        Ok(Some(Coordinates { lat, lng }))
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Typed field values. Upstream records mix strings and numbers freely,
/// so deserialization is untagged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Extract as string, returning None for non-text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value. Text is parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Boolean(_) | FieldValue::Null => None,
        }
    }

    /// Null and empty text count as "no value" for rendering purposes.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Integer(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}
