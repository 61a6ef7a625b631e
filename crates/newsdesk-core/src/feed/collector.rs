use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use super::dedup::SeenSet;
use super::fetcher::{CollectorConfig, FeedFetcher};
use super::models::{NormalizedItem, Source};
use super::parser::parse_feed;
use crate::{Error, Result};

/// Result of fetching and parsing one source
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: Source,
    pub result: Result<Vec<NormalizedItem>>,
}

/// Fetches a fixed set of sources and remembers which items it has delivered
pub struct Collector {
    sources: Vec<Source>,
    config: CollectorConfig,
    semaphore: Arc<Semaphore>,
    seen: SeenSet,
}

impl Collector {
    /// Validate the sources and settings; nothing touches the network here.
    pub fn new<S>(sources: impl IntoIterator<Item = S>, config: CollectorConfig) -> Result<Self>
    where
        S: Into<Source>,
    {
        config.validate()?;
        let sources: Vec<Source> = sources.into_iter().map(Into::into).collect();

        let mut urls = HashSet::new();
        for source in &sources {
            let url = Url::parse(&source.url)
                .map_err(|e| Error::InvalidSource(format!("{}: {}", source.url, e)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::InvalidSource(format!(
                    "{}: unsupported scheme '{}'",
                    source.url,
                    url.scheme()
                )));
            }
            if !urls.insert(source.url.as_str()) {
                return Err(Error::InvalidSource(format!("duplicate source URL: {}", source.url)));
            }
        }

        let permits = config.concurrency.max(1);
        Ok(Self {
            sources,
            config,
            semaphore: Arc::new(Semaphore::new(permits)),
            seen: SeenSet::new(),
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Number of identity keys recorded so far
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// One-shot fetch of every source with a client built for this call.
    ///
    /// Only client construction can fail; per-source failures are logged
    /// and leave that source out of the result.
    pub async fn fetch_all(&self) -> Result<Vec<NormalizedItem>> {
        let fetcher = FeedFetcher::new(&self.config)?;
        Ok(self.collect(&fetcher).await)
    }

    /// One-shot fetch of every source through a caller-supplied client
    pub async fn fetch_all_with(&self, client: &Client) -> Vec<NormalizedItem> {
        let fetcher = FeedFetcher::with_client(client.clone(), &self.config);
        self.collect(&fetcher).await
    }

    /// Per-source outcomes, in completion order
    pub async fn fetch_outcomes(&self, fetcher: &FeedFetcher) -> Vec<SourceOutcome> {
        let mut join_set = JoinSet::new();

        for source in &self.sources {
            let fetcher = fetcher.clone();
            let semaphore = Arc::clone(&self.semaphore);
            let source = source.clone();

            join_set.spawn(async move {
                let result = fetch_source(&fetcher, &semaphore, &source).await;
                SourceOutcome { source, result }
            });
        }

        let mut outcomes = Vec::with_capacity(self.sources.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Feed task join error: {}", e),
            }
        }
        outcomes
    }

    /// Drop items this collector has already delivered (see [`SeenSet`])
    pub fn dedupe(&self, items: Vec<NormalizedItem>) -> Vec<NormalizedItem> {
        self.seen.retain_new(items)
    }

    /// Fetch every source through `fetcher` and flatten the successes
    pub async fn collect(&self, fetcher: &FeedFetcher) -> Vec<NormalizedItem> {
        let outcomes = self.fetch_outcomes(fetcher).await;

        let mut items = Vec::new();
        let mut failed = 0;
        for outcome in outcomes {
            match outcome.result {
                Ok(parsed) => items.extend(parsed),
                Err(e) => {
                    failed += 1;
                    tracing::warn!("Feed fetch failed for '{}': {}", outcome.source.label(), e);
                }
            }
        }

        tracing::debug!(
            sources = self.sources.len(),
            failed = failed,
            items = items.len(),
            "Fetch batch complete"
        );
        items
    }
}

/// Fetch under a concurrency permit, then parse.
/// Malformed documents are logged and count as an empty feed.
async fn fetch_source(
    fetcher: &FeedFetcher,
    semaphore: &Semaphore,
    source: &Source,
) -> Result<Vec<NormalizedItem>> {
    let body = {
        let _permit = semaphore
            .acquire()
            .await
            .map_err(|_| Error::Other("fetch semaphore closed".to_string()))?;
        fetcher.fetch(&source.url).await?
    };

    match parse_feed(&body, source) {
        Ok(items) => {
            tracing::debug!("Feed '{}': {} items", source.label(), items.len());
            Ok(items)
        }
        Err(e) => {
            tracing::warn!("XML parse error for {}: {}", source.url, e);
            Ok(Vec::new())
        }
    }
}
