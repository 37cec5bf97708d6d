use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// The kind of event an alarm can render a message for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Pokemon,
    Pokestop,
    Gym,
    Egg,
    Raid,
    Weather,
}

impl CategoryKind {
    /// Every category, in the order they appear in an alarms file.
    pub const ALL: [CategoryKind; 6] = [
        CategoryKind::Pokemon,
        CategoryKind::Pokestop,
        CategoryKind::Gym,
        CategoryKind::Egg,
        CategoryKind::Raid,
        CategoryKind::Weather,
    ];

    /// Key used for this category in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Pokemon => "pokemon",
            CategoryKind::Pokestop => "pokestop",
            CategoryKind::Gym => "gym",
            CategoryKind::Egg => "egg",
            CategoryKind::Raid => "raid",
            CategoryKind::Weather => "weather",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryKind::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCategory(s.to_string()))
    }
}
