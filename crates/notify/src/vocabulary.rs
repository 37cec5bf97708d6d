//! Per-category placeholder whitelists and their declared formatting rules.
//!
//! Every `<name>` in an alarm template must appear in the vocabulary of the
//! category it renders. The vocabulary also records how numeric values for
//! that placeholder are formatted (`<iv>` with one decimal, `<pkmn_id_3>`
//! zero-padded to three digits, ...).

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use alarmist_core::CategoryKind;
use serde::{Deserialize, Deserializer};

use crate::registry::{read_document, ValidationError};

/// How a numeric field value is turned into text. Text values are always
/// emitted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Verbatim,
    /// Fixed number of decimal places.
    Fixed(u8),
    /// Integer, left-padded with zeros to the given width.
    ZeroPad(u8),
    /// Rounded integer followed by `%`.
    Percent,
}

impl fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFormat::Verbatim => f.write_str("text"),
            FieldFormat::Fixed(n) => write!(f, "fixed:{}", n),
            FieldFormat::ZeroPad(n) => write!(f, "pad:{}", n),
            FieldFormat::Percent => f.write_str("percent"),
        }
    }
}

impl FromStr for FieldFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = |rest: &str| {
            rest.parse::<u8>()
                .map_err(|_| format!("invalid width in format '{}'", s))
        };
        match s {
            "text" | "verbatim" => Ok(FieldFormat::Verbatim),
            "percent" => Ok(FieldFormat::Percent),
            _ => {
                if let Some(rest) = s.strip_prefix("fixed:") {
                    Ok(FieldFormat::Fixed(digits(rest)?))
                } else if let Some(rest) = s.strip_prefix("pad:") {
                    Ok(FieldFormat::ZeroPad(digits(rest)?))
                } else {
                    Err(format!(
                        "unknown format '{}' (expected text, fixed:N, pad:N or percent)",
                        s
                    ))
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for FieldFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── Built-in vocabulary ─────────────────────────────────────────────

use FieldFormat::{Fixed, Verbatim, ZeroPad};

/// Location, link and enrichment placeholders shared by every category.
const COMMON: &[(&str, FieldFormat)] = &[
    ("id", Verbatim),
    ("lat", Verbatim),
    ("lng", Verbatim),
    ("lat_5", Fixed(5)),
    ("lng_5", Fixed(5)),
    ("gmaps", Verbatim),
    ("applemaps", Verbatim),
    ("dir", Verbatim),
    ("dist", Verbatim),
    ("mention", Verbatim),
    ("geofence", Verbatim),
    ("street", Verbatim),
    ("street_num", Verbatim),
    ("address", Verbatim),
    ("postal", Verbatim),
    ("neighborhood", Verbatim),
    ("sublocality", Verbatim),
    ("city", Verbatim),
    ("county", Verbatim),
    ("state", Verbatim),
    ("country", Verbatim),
    ("walk_dist", Verbatim),
    ("walk_time", Verbatim),
    ("bike_dist", Verbatim),
    ("bike_time", Verbatim),
    ("drive_dist", Verbatim),
    ("drive_time", Verbatim),
];

/// Expiry times, pre-formatted by the caller.
const TIMED: &[(&str, FieldFormat)] = &[
    ("time_left", Verbatim),
    ("12h_time", Verbatim),
    ("24h_time", Verbatim),
];

/// Battle stats shared by wild spawns and raid bosses.
const MONSTER: &[(&str, FieldFormat)] = &[
    ("pkmn", Verbatim),
    ("pkmn_id", Verbatim),
    ("pkmn_id_3", ZeroPad(3)),
    ("cp", Verbatim),
    ("form", Verbatim),
    ("form_or_empty", Verbatim),
    ("form_id", Verbatim),
    ("form_id_or_empty", Verbatim),
    ("quick_move", Verbatim),
    ("charge_move", Verbatim),
    ("quick_id", Verbatim),
    ("quick_damage", Verbatim),
    ("quick_dps", Verbatim),
    ("quick_duration", Verbatim),
    ("quick_energy", Verbatim),
    ("charge_id", Verbatim),
    ("charge_damage", Verbatim),
    ("charge_dps", Verbatim),
    ("charge_duration", Verbatim),
    ("charge_energy", Verbatim),
];

const POKEMON: &[(&str, FieldFormat)] = &[
    ("level", Verbatim),
    ("iv", Fixed(1)),
    ("iv_0", Fixed(0)),
    ("iv_2", Fixed(2)),
    ("atk", Verbatim),
    ("def", Verbatim),
    ("sta", Verbatim),
    ("height", Fixed(2)),
    ("weight", Fixed(2)),
    ("gender", Verbatim),
    ("gendername", Verbatim),
    ("size", Verbatim),
    ("size_full", Verbatim),
    ("tiny_rat", Verbatim),
    ("big_karp", Verbatim),
    ("costume_id", Verbatim),
    ("catch_prob_1", Fixed(1)),
    ("catch_prob_2", Fixed(1)),
    ("catch_prob_3", Fixed(1)),
    ("rating_attack", Verbatim),
    ("rating_defense", Verbatim),
    ("previous_id", Verbatim),
    ("weather_id", Verbatim),
    ("weather_name", Verbatim),
    ("weather_emoji", Verbatim),
    ("weather_dynemoji", Verbatim),
    ("time_id", Verbatim),
    ("pkm_icon", Verbatim),
    ("verified", Verbatim),
    ("spawn_start", Verbatim),
    ("spawn_end", Verbatim),
    ("time_until_despawn", Verbatim),
];

const POKESTOP: &[(&str, FieldFormat)] = &[
    ("name", Verbatim),
    ("description", Verbatim),
    ("url", Verbatim),
    ("deployer", Verbatim),
];

/// Gym identity, shared by gym, egg and raid events.
const GYM_SITE: &[(&str, FieldFormat)] = &[
    ("name", Verbatim),
    ("description", Verbatim),
    ("url", Verbatim),
    ("park", Verbatim),
    ("slots_available", Verbatim),
    ("gymlevel", Verbatim),
    ("gym_icon", Verbatim),
];

const GYM: &[(&str, FieldFormat)] = &[
    ("new_team", Verbatim),
    ("new_team_id", Verbatim),
    ("old_team", Verbatim),
    ("old_team_id", Verbatim),
    ("new_team_leader", Verbatim),
    ("old_team_leader", Verbatim),
    ("defenders", Verbatim),
    ("points", Verbatim),
    ("guard_pkmn_id", Verbatim),
    ("is_in_battle", Verbatim),
];

const RAID_SITE: &[(&str, FieldFormat)] = &[
    ("raid_level", Verbatim),
    ("begin_time_left", Verbatim),
    ("begin_12h_time", Verbatim),
    ("begin_24h_time", Verbatim),
    ("team_id", Verbatim),
    ("team_name", Verbatim),
    ("team_leader", Verbatim),
];

const RAID: &[(&str, FieldFormat)] = &[("min_cp", Verbatim), ("max_cp", Verbatim)];

const WEATHER: &[(&str, FieldFormat)] = &[
    ("weather_name", Verbatim),
    ("weather_dynname", Verbatim),
    ("weather_icon", Verbatim),
    ("weather_emoji", Verbatim),
    ("weather_dynemoji", Verbatim),
    ("gameplay_weather", Verbatim),
    ("cloud", Verbatim),
    ("rain", Verbatim),
    ("wind", Verbatim),
    ("snow", Verbatim),
    ("fog", Verbatim),
    ("wind_dir", Verbatim),
    ("severity", Verbatim),
    ("severity_name", Verbatim),
    ("warning", Verbatim),
    ("time_name", Verbatim),
    ("world_time", Verbatim),
];

fn builtin_groups(category: CategoryKind) -> &'static [&'static [(&'static str, FieldFormat)]] {
    match category {
        CategoryKind::Pokemon => &[COMMON, TIMED, MONSTER, POKEMON],
        CategoryKind::Pokestop => &[COMMON, TIMED, POKESTOP],
        CategoryKind::Gym => &[COMMON, GYM_SITE, GYM],
        CategoryKind::Egg => &[COMMON, TIMED, GYM_SITE, RAID_SITE],
        CategoryKind::Raid => &[COMMON, TIMED, GYM_SITE, RAID_SITE, MONSTER, RAID],
        CategoryKind::Weather => &[COMMON, WEATHER],
    }
}

// ── Placeholder sets ────────────────────────────────────────────────

/// The placeholders valid for one category.
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    category: CategoryKind,
    formats: HashMap<String, FieldFormat>,
}

impl PlaceholderSet {
    fn builtin(category: CategoryKind) -> Self {
        let formats = builtin_groups(category)
            .iter()
            .flat_map(|group| group.iter())
            .map(|(name, format)| (name.to_string(), *format))
            .collect();
        Self { category, formats }
    }

    pub fn category(&self) -> CategoryKind {
        self.category
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    pub fn format_of(&self, name: &str) -> Option<FieldFormat> {
        self.formats.get(name).copied()
    }

    /// Known names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.formats.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn insert(&mut self, name: impl Into<String>, format: FieldFormat) {
        self.formats.insert(name.into(), format);
    }
}

/// Placeholder sets for all categories.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    sets: HashMap<CategoryKind, PlaceholderSet>,
}

/// Extra placeholders read from a file: category → name → format.
pub type VocabularyOverrides = HashMap<CategoryKind, HashMap<String, FieldFormat>>;

impl Vocabulary {
    /// The placeholder names produced by the standard event pipeline.
    pub fn builtin() -> Self {
        let sets = CategoryKind::ALL
            .into_iter()
            .map(|kind| (kind, PlaceholderSet::builtin(kind)))
            .collect();
        Self { sets }
    }

    pub fn for_category(&self, category: CategoryKind) -> &PlaceholderSet {
        // Every category is populated by `builtin`.
        &self.sets[&category]
    }

    /// Declare an additional placeholder (or change the format of an existing one).
    pub fn extend(&mut self, category: CategoryKind, name: impl Into<String>, format: FieldFormat) {
        self.sets
            .entry(category)
            .or_insert_with(|| PlaceholderSet::builtin(category))
            .insert(name, format);
    }

    pub fn apply_overrides(&mut self, overrides: VocabularyOverrides) {
        for (category, names) in overrides {
            for (name, format) in names {
                tracing::debug!(%category, placeholder = %name, %format, "placeholder override");
                self.extend(category, name, format);
            }
        }
    }

    /// Read overrides from a JSON or YAML file and apply them.
    pub fn apply_overrides_from_path(&mut self, path: &Path) -> Result<(), ValidationError> {
        let doc = read_document(path)?;
        let overrides: VocabularyOverrides = serde_json::from_value(doc)
            .map_err(|e| ValidationError::Overrides(format!("{}: {}", path.display(), e)))?;
        let count: usize = overrides.values().map(HashMap::len).sum();
        self.apply_overrides(overrides);
        tracing::info!(path = %path.display(), count, "applied placeholder overrides");
        Ok(())
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
