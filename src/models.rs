use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub title: String,
    pub subtitle: String,
    pub start_date: String, // ISO date or date-time, see scraping::datetime
    pub end_date: String,   // empty when the page states no end time
    pub location: String,
    pub location_address: String,
    pub location_lat: Option<f64>,
    pub location_lng: Option<f64>,
    pub description: String,
    pub link: String,
    pub category: Option<String>,
    pub pos: String,
}

impl Event {
    /// Both coordinates, or `None` if geocoding was skipped or failed.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.location_lat, self.location_lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    pub fn has_end(&self) -> bool {
        !self.end_date.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        Event {
            title: "Orgelkonzert".to_string(),
            subtitle: String::new(),
            start_date: "2018-07-26T21:30:00".to_string(),
            end_date: String::new(),
            location: "Dom".to_string(),
            location_address: "Domplatz 28".to_string(),
            location_lat: None,
            location_lng: None,
            description: "Sommerliche Orgelmusik".to_string(),
            link: "https://www.muenster.de/veranstaltungskalender/1".to_string(),
            category: Some("Musik".to_string()),
            pos: "4711".to_string(),
        }
    }

    #[test]
    fn coordinates_require_both_halves() {
        let mut event = sample();
        assert_eq!(event.coordinates(), None);

        event.location_lat = Some(51.96);
        assert_eq!(event.coordinates(), None);

        event.location_lng = Some(7.62);
        assert_eq!(
            event.coordinates(),
            Some(Coordinates {
                lat: 51.96,
                lng: 7.62
            })
        );
    }

    #[test]
    fn serializes_missing_coordinates_as_null() {
        let value = serde_json::to_value(sample()).expect("serialize event");
        assert!(value["location_lat"].is_null());
        assert!(value["location_lng"].is_null());
        assert_eq!(value["end_date"], "");
        assert_eq!(value["category"], "Musik");
    }
}
