use std::path::PathBuf;

use clap::Parser;

use muenster_events_lib::config::{AppConfig, Overrides};
use muenster_events_lib::RunOptions;

#[derive(Parser)]
#[command(
    name = "muenster-events",
    about = "Scrape the Münster events calendar into a JSON-lines feed"
)]
struct Cli {
    /// First day to search (as the calendar form expects it); needs --end
    #[arg(long)]
    start: Option<String>,
    /// Last day to search
    #[arg(long)]
    end: Option<String>,
    /// MapQuest API key; enables geocoding (default: $MAPQUEST_KEY)
    #[arg(long)]
    mapquest_key: Option<String>,
    /// Elasticsearch URL plus index prefix, e.g. http://localhost:9200/muenster_
    /// (default: $ELASTICSEARCH_URL_PREFIX)
    #[arg(long)]
    elasticsearch_url_prefix: Option<String>,
    /// Write the feed to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Follow at most this many detail pages
    #[arg(short = 'n', long)]
    limit: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::resolve(Overrides {
        start: cli.start,
        end: cli.end,
        mapquest_key: cli.mapquest_key,
        elasticsearch_url_prefix: cli.elasticsearch_url_prefix,
    })?;

    let stats = muenster_events_lib::run(
        &config,
        &RunOptions {
            output: cli.output,
            limit: cli.limit,
        },
    )?;

    if stats.links > 0 && stats.events == 0 {
        anyhow::bail!("no events scraped from {} detail pages", stats.links);
    }
    Ok(())
}
