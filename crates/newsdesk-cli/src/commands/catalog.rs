use anyhow::{bail, Result};

use newsdesk_core::FeedCatalog;

pub fn run(publisher: Option<&str>) -> Result<()> {
    let catalog = FeedCatalog::builtin();

    let Some(name) = publisher else {
        println!("Publishers ({}):\n", catalog.publishers().len());
        for p in catalog.publishers() {
            println!("  {} - {} (default: {})", p.id, p.brand, p.default_feed);
            println!("    Feeds: {}", p.feeds.len());
        }
        println!("\nRun `newsdesk catalog <publisher>` to list its feeds.");
        return Ok(());
    };

    let Some(p) = catalog.publisher(name) else {
        bail!("Unknown publisher: {}", name);
    };

    println!("{} ({} feeds):\n", p.brand, p.feeds.len());
    for feed in p.feeds {
        let marker = if feed.key == p.default_feed { " *" } else { "" };
        println!("  {:<16} {}{}", feed.key, feed.description, marker);
        println!("    URL: {}", p.feed_url(feed));
    }
    Ok(())
}
