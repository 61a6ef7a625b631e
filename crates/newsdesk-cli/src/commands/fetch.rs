use std::path::PathBuf;

use anyhow::Result;

use newsdesk_core::{AppConfig, Collector, CollectorConfig};

use super::{print_items, print_no_sources, select_sources};

pub async fn run(config: &AppConfig, urls: &[String], opml: Option<&PathBuf>, json: bool) -> Result<()> {
    let sources = select_sources(config, urls, opml)?;
    if sources.is_empty() {
        print_no_sources();
        return Ok(());
    }

    let collector = Collector::new(sources, CollectorConfig::from(&config.fetch))?;
    let items = collector.fetch_all().await?;

    if !json {
        println!(
            "Fetched {} items from {} sources\n",
            items.len(),
            collector.sources().len()
        );
    }
    print_items(&items, json)
}
