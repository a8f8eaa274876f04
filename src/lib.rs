pub mod config;
pub mod feed;
pub mod geocode;
pub mod models;
pub mod publish;
pub mod scraping;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use config::AppConfig;
use feed::FeedWriter;
use geocode::GeoEnricher;
use publish::Publisher;
use scraping::base::HttpFetcher;
use scraping::{CrawlStats, EventsSpider};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub limit: Option<usize>,
}

/// Crawls the calendar once and writes every event to the feed.
pub fn run(config: &AppConfig, options: &RunOptions) -> Result<CrawlStats> {
    let fetcher = HttpFetcher::new()?;
    let geocoder = GeoEnricher::from_config(config, fetcher.client().clone());
    let publisher = Publisher::from_config(config, fetcher.client().clone());
    info!(
        mode = ?config.date_mode,
        geocoding = geocoder.is_enabled(),
        indexing = publisher.is_enabled(),
        "starting crawl"
    );

    let spider =
        EventsSpider::new(config, &fetcher, &geocoder, &publisher).with_limit(options.limit);
    let mut feed = FeedWriter::open(options.output.as_deref())?;

    let mut crawl = spider.crawl()?;
    for event in crawl.by_ref() {
        feed.write(&event)?;
    }
    let stats = crawl.stats();
    feed.finish()?;

    info!(
        events = stats.events,
        skipped = stats.skipped,
        published = stats.published,
        "crawl finished"
    );
    Ok(stats)
}
