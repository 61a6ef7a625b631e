use anyhow::Result;

use newsdesk_core::{AppConfig, Collector, CollectorConfig, FeedCatalog};

use super::print_items;

pub async fn run(config: &AppConfig, publisher: &str, topic: &[String], json: bool) -> Result<()> {
    let source = FeedCatalog::builtin().resolve(publisher, &topic.join(" "))?;

    if !json {
        println!("{} ({})\n", source.label(), source.url);
    }

    let collector = Collector::new(vec![source], CollectorConfig::from(&config.fetch))?;
    let items = collector.fetch_all().await?;

    if items.is_empty() && !json {
        println!("No items available.");
        return Ok(());
    }
    print_items(&items, json)
}
