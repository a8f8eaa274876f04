use tracing::debug;

use super::base::{self, div_with_class};
use super::datetime;
use super::{ExtractError, PageQuery};
use crate::geocode::GeoEnricher;
use crate::models::Event;

const TITLE: &str = "titel";
const SUBTITLE: &str = "untertitel";
const DATE_TIME: &str = "datum-uhrzeit";
const DESCRIPTION: &str = "detailbeschreibung";
const LOCATION: &str = "location";
const LOCATION_ADDRESS: &str = "location-adresse";
const LINK_SELECTOR: &str = "div[class=\"detail-link\"] > a";
const POS_SELECTOR: &str = "input[name=\"pos\"]";

/// Builds one [`Event`] from a detail page.
pub struct EventAssembler<'a> {
    geocoder: &'a GeoEnricher,
}

impl<'a> EventAssembler<'a> {
    pub fn new(geocoder: &'a GeoEnricher) -> Self {
        Self { geocoder }
    }

    pub fn assemble(
        &self,
        page: &dyn PageQuery,
        category: Option<String>,
    ) -> Result<Event, ExtractError> {
        let field = |class: &str| base::extract_field(page, &div_with_class(class));

        let title = field(TITLE)?;
        if title.is_empty() {
            return Err(ExtractError::FieldNotFound {
                selector: div_with_class(TITLE),
            });
        }
        let subtitle = field(SUBTITLE)?;
        let raw_datetime = field(DATE_TIME)?;
        let description = field(DESCRIPTION)?;
        let location = field(LOCATION)?;
        let location_address = field(LOCATION_ADDRESS)?;
        let href = base::extract_attribute(page, LINK_SELECTOR, "href")?;
        let link = base::absolute_url(page.url(), &href).unwrap_or(href);
        let pos = base::extract_attribute(page, POS_SELECTOR, "value").unwrap_or_default();

        let (start_date, end_date) = datetime::normalize(&raw_datetime)?;

        let coordinates = if self.geocoder.is_enabled() {
            self.geocoder.enrich(&location_address)
        } else {
            None
        };
        debug!(%title, %start_date, geocoded = coordinates.is_some(), "assembled event");

        Ok(Event {
            title,
            subtitle,
            start_date,
            end_date,
            location,
            location_address,
            location_lat: coordinates.map(|c| c.lat),
            location_lng: coordinates.map(|c| c.lng),
            description,
            link,
            category,
            pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::base::HtmlPage;

    const DETAIL_HTML: &str = r#"
    <html><body>
      <form action="merken.php"><input type="hidden" name="pos" value=" 4711 "></form>
      <div class="titel">Orgelsommer im Dom</div>
      <div class="untertitel">Werke von Bach</div>
      <div class="datum-uhrzeit">Donnerstag, 26.7.2018, 21.30 - 23.30 Uhr</div>
      <div class="detailbeschreibung">
          Eine Stunde Orgelmusik.
      </div>
      <div class="location">St.-Paulus-Dom</div>
      <div class="location-adresse">Domplatz 28, 48143 Münster</div>
      <div class="detail-link"><a href="/veranstaltungskalender/detail/4711">Link</a></div>
    </body></html>
    "#;

    fn page(html: &str) -> HtmlPage {
        HtmlPage::parse(
            "https://www.muenster.de/veranstaltungskalender/scripts/frontend/detail.php?pos=4711",
            html,
        )
    }

    #[test]
    fn assembles_all_fields() {
        let geocoder = GeoEnricher::disabled();
        let event = EventAssembler::new(&geocoder)
            .assemble(&page(DETAIL_HTML), Some("Konzerte".to_string()))
            .expect("assemble");

        assert_eq!(event.title, "Orgelsommer im Dom");
        assert_eq!(event.subtitle, "Werke von Bach");
        assert_eq!(event.start_date, "2018-07-26T21:30:00");
        assert_eq!(event.end_date, "2018-07-26T23:30:00");
        assert_eq!(event.description, "Eine Stunde Orgelmusik.");
        assert_eq!(event.location, "St.-Paulus-Dom");
        assert_eq!(event.location_address, "Domplatz 28, 48143 Münster");
        assert_eq!(
            event.link,
            "https://www.muenster.de/veranstaltungskalender/detail/4711"
        );
        assert_eq!(event.category.as_deref(), Some("Konzerte"));
        assert_eq!(event.pos, "4711");
        assert_eq!(event.coordinates(), None);
    }

    #[test]
    fn missing_title_aborts_assembly() {
        let html = DETAIL_HTML.replace("class=\"titel\"", "class=\"kopf\"");
        let geocoder = GeoEnricher::disabled();
        let err = EventAssembler::new(&geocoder)
            .assemble(&page(&html), None)
            .expect_err("no title");
        assert_eq!(
            err,
            ExtractError::FieldNotFound {
                selector: "div[class=\"titel\"]".to_string()
            }
        );
    }

    #[test]
    fn blank_title_counts_as_missing() {
        let html = DETAIL_HTML.replace("Orgelsommer im Dom", "  ");
        let geocoder = GeoEnricher::disabled();
        let result = EventAssembler::new(&geocoder).assemble(&page(&html), None);
        assert!(matches!(result, Err(ExtractError::FieldNotFound { .. })));
    }

    #[test]
    fn malformed_date_aborts_assembly() {
        let html = DETAIL_HTML.replace("21.30 - 23.30 Uhr", "abends");
        let geocoder = GeoEnricher::disabled();
        let result = EventAssembler::new(&geocoder).assemble(&page(&html), None);
        assert!(matches!(result, Err(ExtractError::MalformedDateTime { .. })));
    }

    #[test]
    fn missing_pos_leaves_it_empty() {
        let html = DETAIL_HTML.replace("name=\"pos\"", "name=\"ref\"");
        let geocoder = GeoEnricher::disabled();
        let event = EventAssembler::new(&geocoder)
            .assemble(&page(&html), None)
            .expect("assemble");
        assert_eq!(event.pos, "");
        assert_eq!(event.category, None);
    }
}
