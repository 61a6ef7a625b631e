pub mod catalog;
pub mod fetch;
pub mod news;
pub mod poll;
pub mod sources;

use std::path::PathBuf;

use anyhow::{Context, Result};

use newsdesk_core::feed::parse_opml_file;
use newsdesk_core::{AppConfig, NormalizedItem, Source};

/// Sources named on the command line, else the configured ones
pub fn select_sources(
    config: &AppConfig,
    urls: &[String],
    opml: Option<&PathBuf>,
) -> Result<Vec<Source>> {
    let mut sources: Vec<Source> = urls.iter().map(|u| Source::new(u.as_str())).collect();

    if let Some(path) = opml {
        let imported = parse_opml_file(path)
            .with_context(|| format!("Failed to read OPML file {}", path.display()))?;
        tracing::info!("Loaded {} sources from {}", imported.len(), path.display());
        sources.extend(imported);
    }

    if sources.is_empty() {
        sources = config.sources();
    }
    Ok(sources)
}

pub fn print_items(items: &[NormalizedItem], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(items)?);
        return Ok(());
    }

    for item in items {
        println!("{}\n", item.digest());
    }
    Ok(())
}

pub fn print_no_sources() {
    println!("No sources to fetch.");
    println!("\nPass --url or --opml, or add [[sources]] to:");
    println!("  {}", AppConfig::config_path().display());
}
