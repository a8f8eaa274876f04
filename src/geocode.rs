use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::models::Coordinates;

/// Appended to every address so the geocoder searches the right city.
const CITY_QUALIFIER: &str = "Münster,Germany";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

pub const MUENSTER: BoundingBox = BoundingBox {
    min_lat: 51.8,
    max_lat: 52.3,
    min_lng: 7.3,
    max_lng: 8.0,
};

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("geocoder answered with status code {0}")]
    Status(i64),
    #[error("geocoder returned no location")]
    NoLocation,
    #[error("location {lat},{lng} lies outside Münster")]
    OutOfBounds { lat: f64, lng: f64 },
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    info: Info,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct Info {
    statuscode: i64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(rename = "latLng")]
    lat_lng: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Client for the MapQuest open geocoding API.
pub struct MapQuestGeocoder {
    client: Client,
    endpoint: String,
    api_key: String,
    bounds: BoundingBox,
}

impl MapQuestGeocoder {
    pub fn new(client: Client, endpoint: &str, api_key: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            bounds: MUENSTER,
        }
    }

    pub fn lookup(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let mut url =
            Url::parse(&self.endpoint).map_err(|err| GeocodeError::Http(err.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", &self.api_key)
            .append_pair("location", &format!("{address},{CITY_QUALIFIER}"));
        debug!(address, "geocoding");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| GeocodeError::Http(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|err| GeocodeError::Http(err.to_string()))?;
        if !status.is_success() {
            return Err(GeocodeError::Http(format!("status {status}: {text}")));
        }

        let payload: GeocodeResponse =
            serde_json::from_str(&text).map_err(|err| GeocodeError::Parse(err.to_string()))?;
        if payload.info.statuscode != 0 {
            return Err(GeocodeError::Status(payload.info.statuscode));
        }

        let lat_lng = payload
            .results
            .into_iter()
            .next()
            .and_then(|result| result.locations.into_iter().next())
            .map(|location| location.lat_lng)
            .ok_or(GeocodeError::NoLocation)?;
        let point = Coordinates {
            lat: lat_lng.lat,
            lng: lat_lng.lng,
        };

        if !self.bounds.contains(point) {
            return Err(GeocodeError::OutOfBounds {
                lat: point.lat,
                lng: point.lng,
            });
        }
        Ok(point)
    }
}

/// Optional geocoding step; without an API key it never touches the network.
pub struct GeoEnricher {
    geocoder: Option<MapQuestGeocoder>,
}

impl GeoEnricher {
    pub fn from_config(config: &AppConfig, client: Client) -> Self {
        Self {
            geocoder: config
                .mapquest_key
                .as_deref()
                .map(|key| MapQuestGeocoder::new(client, &config.geocode_url, key)),
        }
    }

    pub fn disabled() -> Self {
        Self { geocoder: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.geocoder.is_some()
    }

    /// Coordinates for `address`, or `None` when disabled or on any failure.
    pub fn enrich(&self, address: &str) -> Option<Coordinates> {
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.lookup(address) {
            Ok(point) => Some(point),
            Err(err) => {
                warn!(address, error = %err, "location geocoding failed");
                None
            }
        }
    }
}
