use std::collections::HashSet;

use once_cell::sync::Lazy;
use scraper::Selector;

use super::base::{self, HtmlPage};
use super::PageQuery;

const DETAILS_LABEL: &str = "Details";

static LINK_OR_CATEGORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.kategorie, a[href]").expect("results selector"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLink {
    pub href: String,
    pub category: Option<String>,
}

/// Every "Details" link on a results page, paired with the heading of the
/// category block it appears under. Duplicate links are followed once.
pub fn detail_links(page: &HtmlPage) -> Vec<DetailLink> {
    let mut current_category: Option<String> = None;
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in page.document().select(&LINK_OR_CATEGORY) {
        if element.value().name() == "div" {
            let heading = element.text().collect::<String>();
            let heading = base::strip(&heading);
            current_category = (!heading.is_empty()).then(|| heading.to_string());
            continue;
        }

        let label = element.text().collect::<String>();
        if base::strip(&label) != DETAILS_LABEL {
            continue;
        }
        let Some(href) = element
            .value()
            .attr("href")
            .and_then(|href| base::absolute_url(page.url(), href))
        else {
            continue;
        };
        if seen.insert(href.clone()) {
            links.push(DetailLink {
                href,
                category: current_category.clone(),
            });
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_HTML: &str = r#"
    <html><body>
      <div class="ergebnisse">
        <div class="kategorie">
            Konzerte
        </div>
        <div class="eintrag ">
            <span class="titel">Orgelsommer</span>
            <a href="detail.php?pos=101">Details</a>
        </div>
        <div class="eintrag ">
            <span class="titel">Jazz im Hof</span>
            <a href="detail.php?pos=102"> Details </a>
            <a href="merken.php?pos=102">Merken</a>
        </div>
        <div class="kategorie">Theater</div>
        <div class="eintrag ">
            <a href="https://www.muenster.de/veranstaltungskalender/scripts/frontend/detail.php?pos=201">Details</a>
            <a href="detail.php?pos=101">Details</a>
        </div>
      </div>
    </body></html>
    "#;

    #[test]
    fn pairs_links_with_preceding_category() {
        let page = HtmlPage::parse(
            "https://www.muenster.de/veranstaltungskalender/scripts/frontend/suche.php",
            RESULTS_HTML,
        );
        let links = detail_links(&page);
        let base = "https://www.muenster.de/veranstaltungskalender/scripts/frontend/";

        assert_eq!(
            links,
            vec![
                DetailLink {
                    href: format!("{base}detail.php?pos=101"),
                    category: Some("Konzerte".to_string()),
                },
                DetailLink {
                    href: format!("{base}detail.php?pos=102"),
                    category: Some("Konzerte".to_string()),
                },
                DetailLink {
                    href: format!("{base}detail.php?pos=201"),
                    category: Some("Theater".to_string()),
                },
            ]
        );
    }

    #[test]
    fn links_before_any_category_have_none() {
        let page = HtmlPage::parse(
            "https://example.org/suche",
            r#"<div class="eintrag "><a href="/d?pos=1">Details</a></div>"#,
        );
        assert_eq!(
            detail_links(&page),
            vec![DetailLink {
                href: "https://example.org/d?pos=1".to_string(),
                category: None,
            }]
        );
    }

    #[test]
    fn empty_results_page_has_no_links() {
        let page = HtmlPage::parse("https://example.org/suche", "<p>Keine Treffer</p>");
        assert!(detail_links(&page).is_empty());
    }
}
