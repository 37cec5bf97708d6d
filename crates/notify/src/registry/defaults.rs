//! Built-in message templates used when an alarm omits a category block.

use alarmist_core::CategoryKind;

use super::ChannelType;

/// Raw template strings for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DefaultTemplate {
    pub title: Option<&'static str>,
    pub url: Option<&'static str>,
    pub body: &'static str,
}

const fn rich(title: &'static str, body: &'static str) -> DefaultTemplate {
    DefaultTemplate {
        title: Some(title),
        url: Some("<gmaps>"),
        body,
    }
}

const fn plain(body: &'static str) -> DefaultTemplate {
    DefaultTemplate {
        title: None,
        url: None,
        body,
    }
}

/// Defaults for `channel` and `category`. Weather has none: an alarm only
/// announces weather changes when it configures a `weather` block.
pub(crate) fn default_template(channel: ChannelType, category: CategoryKind) -> Option<DefaultTemplate> {
    if channel.is_rich() {
        let t = match category {
            CategoryKind::Pokemon => rich(
                "A wild <pkmn> has appeared!",
                "Available until <24h_time> (<time_left>).",
            ),
            CategoryKind::Pokestop => rich(
                "Someone has placed a lure on a Pokestop!",
                "Lure will expire at <24h_time> (<time_left>).",
            ),
            CategoryKind::Gym => rich(
                "A Team <old_team> gym has fallen!",
                "It is now controlled by <new_team>.",
            ),
            CategoryKind::Egg => rich(
                "Raid is incoming!",
                "A level <raid_level> raid will hatch at <begin_24h_time> (<begin_time_left>).",
            ),
            CategoryKind::Raid => rich(
                "Level <raid_level> raid is available against <pkmn>!",
                "The raid is available until <24h_time> (<time_left>).",
            ),
            CategoryKind::Weather => return None,
        };
        return Some(t);
    }

    let t = match category {
        CategoryKind::Pokemon => {
            plain("A wild <pkmn> has appeared! Available until <24h_time> (<time_left>). <gmaps>")
        }
        CategoryKind::Pokestop => plain(
            "Someone has placed a lure on a Pokestop! Lure will expire at <24h_time> (<time_left>). <gmaps>",
        ),
        CategoryKind::Gym => {
            plain("A Team <old_team> gym has fallen! It is now controlled by <new_team>. <gmaps>")
        }
        CategoryKind::Egg => {
            plain("lvl <raid_level> raid! Hatches at <begin_24h_time> (<begin_time_left>). <gmaps>")
        }
        CategoryKind::Raid => plain("Raid on <pkmn>! Available until <24h_time> (<time_left>). <gmaps>"),
        CategoryKind::Weather => return None,
    };
    Some(t)
}
