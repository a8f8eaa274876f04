pub mod base;
pub mod datetime;
pub mod detail;
pub mod results;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::geocode::GeoEnricher;
use crate::models::Event;
use crate::publish::{PublishOutcome, Publisher};
use base::HtmlPage;
use detail::EventAssembler;
use results::DetailLink;

const SEARCH_FORM: &str = "submit";

/// Per-page failures; they abort one detail page, never the crawl.
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("malformed date/time {raw:?}")]
    MalformedDateTime { raw: String },
    #[error("no node matches {selector}")]
    FieldNotFound { selector: String },
}

/// A page as returned by the site, after redirects.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub body: String,
}

pub trait Fetcher {
    fn get(&self, url: &str) -> Result<FetchedPage>;
    fn post_form(&self, url: &str, fields: &[(String, String)]) -> Result<FetchedPage>;
}

/// Selector queries over one parsed page.
pub trait PageQuery {
    fn url(&self) -> &str;
    /// Text of every node matching `selector`, in document order.
    fn query_text(&self, selector: &str) -> Vec<String>;
    /// Value of `attr` on every matching node that carries it.
    fn query_attribute(&self, selector: &str, attr: &str) -> Vec<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub links: usize,
    pub events: usize,
    pub skipped: usize,
    pub published: usize,
}

pub struct EventsSpider<'a> {
    config: &'a AppConfig,
    fetcher: &'a dyn Fetcher,
    assembler: EventAssembler<'a>,
    publisher: &'a Publisher,
    limit: Option<usize>,
}

impl<'a> EventsSpider<'a> {
    pub fn new(
        config: &'a AppConfig,
        fetcher: &'a dyn Fetcher,
        geocoder: &'a GeoEnricher,
        publisher: &'a Publisher,
    ) -> Self {
        Self {
            config,
            fetcher,
            assembler: EventAssembler::new(geocoder),
            publisher,
            limit: None,
        }
    }

    /// Follow at most `limit` detail links.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Runs the search and returns the events lazily, one detail page per item.
    pub fn crawl(&self) -> Result<Crawl<'_, 'a>> {
        let mut links = self.search()?;
        if let Some(limit) = self.limit {
            links.truncate(limit);
        }
        info!(links = links.len(), "collected detail links");

        Ok(Crawl {
            stats: CrawlStats {
                links: links.len(),
                ..CrawlStats::default()
            },
            links: links.into_iter(),
            spider: self,
        })
    }

    fn search(&self) -> Result<Vec<DetailLink>> {
        let start = self
            .fetcher
            .get(&self.config.search_url)
            .context("unable to load the search page")?;
        let start_page = HtmlPage::from_fetched(&start);

        let (datum_von, datum_bis, zeitraum) = self.config.date_mode.form_values();
        debug!(datum_von, datum_bis, zeitraum, "submitting search form");
        let results = base::submit_form(
            self.fetcher,
            &start_page,
            SEARCH_FORM,
            &[
                ("datum_bis", datum_bis),
                ("datum_von", datum_von),
                ("submit", "Suchen"),
                ("suchstring", ""),
                ("volltextsuche-verknuepfung", "und"),
                ("zeitraum", zeitraum),
                ("zielgruppe", "alle"),
            ],
        )
        .context("search form submission failed")?;

        Ok(results::detail_links(&HtmlPage::from_fetched(&results)))
    }

    fn process(&self, link: &DetailLink, stats: &mut CrawlStats) -> Result<Event> {
        let fetched = self.fetcher.get(&link.href)?;
        let page = HtmlPage::from_fetched(&fetched);
        let event = self.assembler.assemble(&page, link.category.clone())?;

        match self.publisher.publish(&event) {
            Ok(PublishOutcome::Indexed { result }) => {
                stats.published += 1;
                info!(pos = %event.pos, %result, "event indexed");
            }
            Ok(PublishOutcome::Skipped(reason)) => {
                debug!(pos = %event.pos, ?reason, "event not indexed");
            }
            Err(err) => warn!(pos = %event.pos, error = %err, "indexing failed"),
        }

        Ok(event)
    }
}

/// Lazy, single-pass sequence of events; failing pages are logged and skipped.
pub struct Crawl<'s, 'a> {
    spider: &'s EventsSpider<'a>,
    links: std::vec::IntoIter<DetailLink>,
    stats: CrawlStats,
}

impl Crawl<'_, '_> {
    pub fn stats(&self) -> CrawlStats {
        self.stats
    }
}

impl Iterator for Crawl<'_, '_> {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        loop {
            let link = self.links.next()?;
            match self.spider.process(&link, &mut self.stats) {
                Ok(event) => {
                    self.stats.events += 1;
                    return Some(event);
                }
                Err(err) => {
                    self.stats.skipped += 1;
                    let reason = format!("{err:#}");
                    warn!(url = %link.href, error = %reason, "skipping detail page");
                }
            }
        }
    }
}
