//! Embed color resolution for channels that support colored messages.
//!
//! A rendered `color` template may produce a hex literal, a plain number,
//! an IV percentage, or a well-known name (team, weather, alert level).

pub const DEFAULT_COLOR: u32 = 0x4F545C;

const NAMED: &[(&str, u32)] = &[
    ("?", 0x4F545C),
    ("valor", 0xFE0103),
    ("mystic", 0x1102FD),
    ("instinct", 0xF6F006),
    ("ditto", 0xFF66FF),
    ("pikachu", 0xF6F006),
    ("raichu", 0xF6F006),
    ("moderate alert", 0xF6F006),
    ("extreme alert", 0xFE0103),
    ("clear", 0xF6F006),
    ("rain", 0x012CFF),
    ("partly cloudy", 0x9D9D9D),
    ("cloudy", 0x9D9D9D),
    ("windy", 0xFFFFFF),
    ("snow", 0x00ECFF),
    ("fog", 0x7A8687),
];

/// Quality tier color for an IV percentage.
pub fn iv_color(iv: f64) -> u32 {
    if iv < 25.0 {
        0x9D9D9D
    } else if iv < 50.0 {
        0xFFFFFF
    } else if iv < 81.0 {
        0x0070DD
    } else if iv < 90.0 {
        0xA335EE
    } else if iv < 100.0 {
        0x1EFF00
    } else {
        0xFF8000
    }
}

/// Resolve a rendered color string. Unrecognised input falls back to
/// [`DEFAULT_COLOR`].
pub fn resolve_color(raw: &str) -> u32 {
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_COLOR;
    }

    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .or_else(|| raw.strip_prefix('#'));
    if let Some(hex) = hex {
        return u32::from_str_radix(hex, 16)
            .ok()
            .filter(|c| *c <= 0xFFFFFF)
            .unwrap_or(DEFAULT_COLOR);
    }

    if let Ok(n) = raw.parse::<u32>() {
        return if n <= 100 { iv_color(f64::from(n)) } else { n.min(0xFFFFFF) };
    }
    if let Ok(iv) = raw.parse::<f64>() {
        if (0.0..=100.0).contains(&iv) {
            return iv_color(iv);
        }
        return DEFAULT_COLOR;
    }

    let lower = raw.to_lowercase();
    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, c)| *c)
        .unwrap_or(DEFAULT_COLOR)
}

/// `#rrggbb` form used by Slack attachments.
pub fn to_hex(color: u32) -> String {
    format!("#{:06x}", color & 0xFFFFFF)
}
