//! Static map options and their resolution into an image request.

use std::fmt;
use std::str::FromStr;

use alarmist_core::Coordinates;
use async_trait::async_trait;
use serde::Serialize;

use crate::traits::NotifyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    #[default]
    Roadmap,
    Satellite,
    Hybrid,
    Terrain,
}

impl MapType {
    pub const NAMES: [&'static str; 4] = ["roadmap", "satellite", "hybrid", "terrain"];

    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::Roadmap => "roadmap",
            MapType::Satellite => "satellite",
            MapType::Hybrid => "hybrid",
            MapType::Terrain => "terrain",
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "roadmap" => Ok(MapType::Roadmap),
            "satellite" => Ok(MapType::Satellite),
            "hybrid" => Ok(MapType::Hybrid),
            "terrain" => Ok(MapType::Terrain),
            other => Err(format!("unknown map type '{}'", other)),
        }
    }
}

/// Per-category static map settings, normalized at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MapOptions {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub map_type: MapType,
    pub zoom: u8,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 250,
            height: 125,
            map_type: MapType::Roadmap,
            zoom: 15,
        }
    }
}

/// A fully-resolved map descriptor for one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapImageRequest {
    pub width: u32,
    pub height: u32,
    pub map_type: MapType,
    pub zoom: u8,
    pub coordinates: Coordinates,
}

/// Combine map options with the event location. `None` when the map is
/// disabled or the event has no coordinates.
pub fn resolve(options: &MapOptions, coordinates: Option<Coordinates>) -> Option<MapImageRequest> {
    if !options.enabled {
        return None;
    }
    let coordinates = coordinates?;
    Some(MapImageRequest {
        width: options.width,
        height: options.height,
        map_type: options.map_type,
        zoom: options.zoom,
        coordinates,
    })
}

/// Turns a map descriptor into an image URL.
#[async_trait]
pub trait MapRenderer: Send + Sync {
    async fn render(&self, request: &MapImageRequest) -> Result<String, NotifyError>;
}

/// Google Static Maps URL builder. Performs no I/O.
#[derive(Debug, Clone, Default)]
pub struct GoogleStaticMap {
    api_key: Option<String>,
}

const STATIC_MAP_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/staticmap";

impl GoogleStaticMap {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    pub fn url(&self, request: &MapImageRequest) -> String {
        let center = format!("{},{}", request.coordinates.lat, request.coordinates.lng);
        let mut url = format!(
            "{}?center={}&markers=color:red%7C{}&maptype={}&size={}x{}&zoom={}",
            STATIC_MAP_ENDPOINT,
            center,
            center,
            request.map_type,
            request.width,
            request.height,
            request.zoom
        );
        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }
        url
    }
}

#[async_trait]
impl MapRenderer for GoogleStaticMap {
    async fn render(&self, request: &MapImageRequest) -> Result<String, NotifyError> {
        Ok(self.url(request))
    }
}
