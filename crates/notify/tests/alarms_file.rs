//! Integration tests that load the example alarm configuration in
//! `data/alarms/` and push events through the full dispatch pipeline.

use std::sync::{Arc, Mutex};

use alarmist_core::{CategoryKind, EventRecord};
use alarmist_notify::{
    AlarmId, ChannelAdapter, ChannelPayload, ChannelType, DispatchResult, Dispatcher, GoogleStaticMap, LoadPolicy,
    NotifyError, Registry, Vocabulary,
};

/// Resolve a data file relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn data_path(relative: &str) -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data").join(relative)
}

fn load(relative: &str) -> Registry {
    let path = data_path(relative);
    Registry::from_path(&path, &Vocabulary::builtin(), LoadPolicy::Strict)
        .unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

/// Records every payload it is asked to deliver.
#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<ChannelPayload>>,
}

#[async_trait::async_trait]
impl ChannelAdapter for Recorder {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(payload.clone());
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "recorder"
    }
}

fn dispatcher_with_recorders(registry: Registry) -> (Dispatcher, Vec<(AlarmId, Arc<Recorder>)>) {
    let registry = Arc::new(registry);
    let mut dispatcher = Dispatcher::new(Arc::clone(&registry)).with_map_renderer(Arc::new(GoogleStaticMap::new(None)));
    let mut recorders = Vec::new();
    for alarm in registry.alarms() {
        let recorder = Arc::new(Recorder::default());
        dispatcher.set_adapter(alarm.id, recorder.clone());
        recorders.push((alarm.id, recorder));
    }
    (dispatcher, recorders)
}

fn sent_to(recorders: &[(AlarmId, Arc<Recorder>)], id: AlarmId) -> Vec<serde_json::Value> {
    let (_, recorder) = recorders.iter().find(|(a, _)| *a == id).unwrap();
    recorder
        .sent
        .lock()
        .unwrap()
        .iter()
        .map(|p| serde_json::to_value(p).unwrap())
        .collect()
}

#[test]
fn example_json_loads_every_channel() {
    let registry = load("alarms/alarms.json");
    let channels: Vec<ChannelType> = registry.alarms().iter().map(|a| a.channel_type()).collect();
    assert_eq!(channels, ChannelType::ALL.to_vec());
    assert!(registry.skipped().is_empty());
}

#[test]
fn example_json_active_alarms() {
    let registry = load("alarms/alarms.json");

    let pokemon: Vec<AlarmId> = registry
        .active_alarms_for(CategoryKind::Pokemon)
        .iter()
        .map(|a| a.id)
        .collect();
    // discord, telegram, pushbullet are active; every channel has a pokemon default
    assert_eq!(pokemon, vec![AlarmId(0), AlarmId(2), AlarmId(4)]);

    let weather: Vec<AlarmId> = registry
        .active_alarms_for(CategoryKind::Weather)
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(weather, vec![AlarmId(0)]);
}

#[test]
fn example_json_map_options_normalized() {
    let registry = load("alarms/alarms.json");
    let discord = &registry.alarms()[0];
    let raid = discord.template_for(CategoryKind::Raid).unwrap();
    assert_eq!(raid.map.zoom, 14);
    assert_eq!(raid.map.width, 250);
    let weather = discord.template_for(CategoryKind::Weather).unwrap();
    assert!(!weather.map.enabled);
}

#[test]
fn example_yaml_loads() {
    let registry = load("alarms/alarms.yml");
    assert_eq!(registry.alarms().len(), 2);
    assert_eq!(registry.alarms()[0].name.as_deref(), Some("yaml-discord"));
    assert!(!registry.alarms()[1].active);
}

#[test]
fn example_placeholder_overrides_apply() {
    let mut vocabulary = Vocabulary::builtin();
    vocabulary
        .apply_overrides_from_path(&data_path("placeholders.example.yml"))
        .unwrap();
    assert!(vocabulary.for_category(CategoryKind::Pokemon).contains("shiny_rate"));
    assert!(vocabulary.for_category(CategoryKind::Weather).contains("temperature"));
}

#[tokio::test]
async fn pokemon_event_renders_per_channel() {
    let (dispatcher, recorders) = dispatcher_with_recorders(load("alarms/alarms.json"));

    let event = EventRecord::new(CategoryKind::Pokemon)
        .with_field("pkmn", "Dragonite")
        .with_field("pkmn_id_3", 149)
        .with_field("iv", 100.0)
        .with_field("cp", 3500)
        .with_field("24h_time", "18:42:10")
        .with_field("time_left", "12m 5s")
        .with_field("gmaps", "https://maps.google.com/maps?q=40.7,-74")
        .with_field("lat", 40.7)
        .with_field("lng", -74.0);

    let results = dispatcher.dispatch(&event).await;
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(DispatchResult::is_delivered));

    let discord = sent_to(&recorders, AlarmId(0));
    let embed = &discord[0]["embeds"][0];
    assert_eq!(embed["title"], "A wild Dragonite has appeared! (100.0%)");
    assert_eq!(embed["color"], 0xFF8000);
    assert_eq!(
        embed["description"],
        "Available until 18:42:10 (12m 5s).\nCP 3500"
    );
    assert!(embed["image"]["url"].as_str().unwrap().contains("maptype=roadmap"));
    assert_eq!(discord[0]["username"], "Dragonite");

    let telegram = sent_to(&recorders, AlarmId(2));
    assert_eq!(
        telegram[0]["text"],
        "A wild Dragonite has appeared! Available until 18:42:10 (12m 5s). https://maps.google.com/maps?q=40.7,-74"
    );

    let pushbullet = sent_to(&recorders, AlarmId(4));
    assert_eq!(pushbullet[0]["type"], "link");
    assert_eq!(pushbullet[0]["title"], "A wild Dragonite has appeared!");

    // inactive alarms never see the event
    assert!(sent_to(&recorders, AlarmId(6)).is_empty());
}

#[tokio::test]
async fn weather_event_only_reaches_configured_alarm() {
    let (dispatcher, recorders) = dispatcher_with_recorders(load("alarms/alarms.json"));

    let event = EventRecord::new(CategoryKind::Weather)
        .with_field("weather_name", "Rain")
        .with_field("lat", 1.0)
        .with_field("lng", 2.0);
    let results = dispatcher.dispatch(&event).await;
    assert_eq!(results.len(), 1);

    let discord = sent_to(&recorders, AlarmId(0));
    let embed = &discord[0]["embeds"][0];
    assert_eq!(embed["title"], "Weather in Rain");
    assert_eq!(embed["color"], 0x012CFF);
    assert!(embed.get("description").is_none());
    assert!(embed.get("image").is_none());
}

#[tokio::test]
async fn startup_announcement_reaches_active_alarms() {
    let (dispatcher, recorders) = dispatcher_with_recorders(load("alarms/alarms.json"));
    let results = dispatcher.announce_startup().await;
    let ids: Vec<AlarmId> = results.iter().map(DispatchResult::alarm_id).collect();
    assert_eq!(ids, vec![AlarmId(0), AlarmId(2), AlarmId(4)]);
    assert_eq!(sent_to(&recorders, AlarmId(2)).len(), 1);
}
