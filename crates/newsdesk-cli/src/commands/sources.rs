use anyhow::Result;

use newsdesk_core::AppConfig;

pub fn run(config: &AppConfig) -> Result<()> {
    let sources = config.sources();

    if sources.is_empty() {
        println!("No sources configured.");
        println!("\nAdd [[sources]] entries to:");
        println!("  {}", AppConfig::config_path().display());
        return Ok(());
    }

    println!("Sources ({}):\n", sources.len());
    for source in &sources {
        println!("  {}", source.label());
        println!("    URL: {}", source.url);
        if !source.tags.is_empty() {
            println!("    Tags: {}", source.tags.join(", "));
        }
    }
    Ok(())
}
