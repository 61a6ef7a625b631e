use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::watch;

use newsdesk_core::{AppConfig, Collector, CollectorConfig, Poller};

use super::{print_items, print_no_sources, select_sources};

pub async fn run(
    config: &AppConfig,
    urls: &[String],
    opml: Option<&PathBuf>,
    interval_secs: Option<u64>,
    json: bool,
) -> Result<()> {
    let sources = select_sources(config, urls, opml)?;
    if sources.is_empty() {
        print_no_sources();
        return Ok(());
    }

    let interval = interval_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll.interval());

    let collector = Arc::new(Collector::new(sources, CollectorConfig::from(&config.fetch))?);
    let poller = Poller::new(Arc::clone(&collector), interval)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, stopping");
            let _ = shutdown_tx.send(true);
        }
    });

    if !json {
        println!(
            "Polling {} sources every {}s (Ctrl-C to stop)\n",
            collector.sources().len(),
            poller.interval().as_secs()
        );
    }

    let stream = poller.into_stream(shutdown_rx);
    futures::pin_mut!(stream);

    while let Some(batch) = stream.next().await {
        if json {
            for item in &batch {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("--- {} new items ---\n", batch.len());
            print_items(&batch, false)?;
        }
    }

    tracing::info!("Stopped after tracking {} items", collector.seen_count());
    Ok(())
}
