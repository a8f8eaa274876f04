use reqwest::blocking::Client;
use reqwest::Url;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AppConfig, IndexTarget};
use crate::models::{Coordinates, Event};

const DOCUMENT_TYPE: &str = "event";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event has no pos to key the document by")]
    MissingPosition,
    #[error("http error: {0}")]
    Http(String),
    #[error("index error: {0}")]
    Index(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoCoordinates,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Skipped(SkipReason),
    Indexed { result: String },
}

/// Upserts geocoded events into the `<prefix>places` Elasticsearch index.
pub struct Publisher {
    target: Option<IndexTarget>,
    client: Client,
}

impl Publisher {
    pub fn from_config(config: &AppConfig, client: Client) -> Self {
        Self {
            target: config.index.clone(),
            client,
        }
    }

    pub fn disabled() -> Self {
        Self {
            target: None,
            client: Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    pub fn publish(&self, event: &Event) -> Result<PublishOutcome, PublishError> {
        let Some(target) = self.target.as_ref() else {
            return Ok(PublishOutcome::Skipped(SkipReason::Disabled));
        };
        let Some(point) = event.coordinates() else {
            return Ok(PublishOutcome::Skipped(SkipReason::NoCoordinates));
        };
        if event.pos.is_empty() {
            return Err(PublishError::MissingPosition);
        }

        let id = document_id(event);
        let index = target.index_name();
        let mut url =
            Url::parse(&target.base_url).map_err(|err| PublishError::Http(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| PublishError::Http(format!("{} cannot take a path", target.base_url)))?
            .pop_if_empty()
            .extend([index.as_str(), "_doc", id.as_str()]);
        debug!(%url, "indexing event");

        let response = self
            .client
            .put(url)
            .json(&index_document(event, point))
            .send()
            .map_err(|err| PublishError::Http(err.to_string()))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|err| PublishError::Http(err.to_string()))?;
        info!(%index, %id, response = %body, "index response");

        if !status.is_success() {
            return Err(PublishError::Index(body.to_string()));
        }

        let result = body
            .get("result")
            .and_then(|val| val.as_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(PublishOutcome::Indexed { result })
    }
}

pub fn document_id(event: &Event) -> String {
    format!("event_{}", event.pos)
}

pub fn index_document(event: &Event, point: Coordinates) -> Value {
    let mut document = json!({
        "address": {
            "geo": {
                "lat": point.lat,
                "lon": point.lng,
            },
            "geometry": {
                "type": "Point",
                "coordinates": [point.lng, point.lat],
            },
            "street": event.location_address,
        },
        "date_start": event.start_date,
        "type": DOCUMENT_TYPE,
        "name": event.title,
        "id": event.pos,
        "description": event.description,
        "properties": {
            "ID": event.pos,
            "name": event.title,
            "link": event.link,
        },
        "subtitle": event.subtitle,
        "location": event.location,
    });
    if event.has_end() {
        document["date_end"] = json!(event.end_date);
    }
    document
}
