use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    profiled_env_opt(profile, key)
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

/// Parse a boolean-like string the way alarm files spell them
/// (`True`, `yes`, `f`, ...). Case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub alarms: AlarmsConfig,
    pub delivery: DeliveryConfig,
    pub maps: MapsConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `ALARMIST_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("ALARMIST_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            alarms: AlarmsConfig::from_env_profiled(p),
            delivery: DeliveryConfig::from_env_profiled(p),
            maps: MapsConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  alarms:      file={}, skip_invalid={}, watch={}",
            self.alarms.file.display(),
            self.alarms.skip_invalid,
            self.alarms.watch
        );
        tracing::info!(
            "  placeholders: file={}",
            self.alarms
                .placeholders_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in)".to_string())
        );
        tracing::info!(
            "  delivery:    timeout={}s, max_attempts={}, backoff={}ms",
            self.delivery.timeout_secs,
            self.delivery.max_attempts,
            self.delivery.backoff_ms
        );
        tracing::info!("  maps:        google_key={}", if self.maps.is_configured() { "set" } else { "(none)" });
    }
}

// ── Alarms ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmsConfig {
    /// JSON or YAML file holding the list of alarms.
    pub file: PathBuf,
    /// Optional file extending the built-in placeholder vocabulary.
    pub placeholders_file: Option<PathBuf>,
    /// Skip malformed alarm entries instead of refusing to start.
    pub skip_invalid: bool,
    /// Reload the alarms file when it changes on disk.
    pub watch: bool,
}

impl AlarmsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            file: PathBuf::from(profiled_env_or(p, "ALARMS_FILE", "alarms.json")),
            placeholders_file: profiled_env_opt(p, "PLACEHOLDERS_FILE").map(PathBuf::from),
            skip_invalid: profiled_env_bool(p, "ALARMS_SKIP_INVALID", false),
            watch: profiled_env_bool(p, "ALARMS_WATCH", false),
        }
    }
}

// ── Delivery ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Upper bound for one alarm's delivery, retries included.
    pub timeout_secs: u64,
    /// Attempts per delivery before giving up (1 = no retry).
    pub max_attempts: u32,
    /// Base delay between attempts; doubled after every failure.
    pub backoff_ms: u64,
}

impl DeliveryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            timeout_secs: profiled_env_u64(p, "DELIVERY_TIMEOUT_SECS", 30),
            max_attempts: profiled_env_u32(p, "DELIVERY_MAX_ATTEMPTS", 3),
            backoff_ms: profiled_env_u64(p, "DELIVERY_BACKOFF_MS", 500),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

// ── Maps ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    pub google_key: Option<String>,
}

impl MapsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            google_key: profiled_env_opt(p, "GOOGLE_MAPS_KEY"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.google_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flag_accepts_alarm_file_spellings() {
        assert_eq!(parse_flag("True"), Some(true));
        assert_eq!(parse_flag("FALSE"), Some(false));
        assert_eq!(parse_flag("y"), Some(true));
        assert_eq!(parse_flag(" no "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("ALARMIST_CFG_TEST_ALARMS_FILE", "prod-alarms.yml");
        env::set_var("ALARMS_FILE", "plain.json");
        let cfg = Config::for_profile("alarmist_cfg_test");
        assert_eq!(cfg.alarms.file, PathBuf::from("prod-alarms.yml"));
        assert_eq!(cfg.profile_label(), "ALARMIST_CFG_TEST");
        env::remove_var("ALARMIST_CFG_TEST_ALARMS_FILE");
        env::remove_var("ALARMS_FILE");
    }

    #[test]
    fn delivery_defaults() {
        let cfg = DeliveryConfig::from_env_profiled("NO_SUCH_DELIVERY_PROFILE");
        assert!(cfg.max_attempts >= 1);
        assert_eq!(cfg.timeout(), Duration::from_secs(cfg.timeout_secs));
    }
}
