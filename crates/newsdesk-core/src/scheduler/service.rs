use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::feed::{Collector, FeedFetcher, NormalizedItem};
use crate::Result;

/// Shortest sleep allowed between poll cycles
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Hook run with each new-item batch before it is yielded
pub type BatchCallback = Arc<dyn Fn(&[NormalizedItem]) -> anyhow::Result<()> + Send + Sync>;

/// Repeatedly fetches a collector's sources and yields only unseen items
pub struct Poller {
    collector: Arc<Collector>,
    fetcher: FeedFetcher,
    interval: Duration,
    callback: Option<BatchCallback>,
}

impl Poller {
    /// Create a poller; intervals under one second are raised to one second
    pub fn new(collector: Arc<Collector>, interval: Duration) -> Result<Self> {
        let fetcher = FeedFetcher::new(collector.config())?;
        Ok(Self {
            collector,
            fetcher,
            interval: interval.max(MIN_POLL_INTERVAL),
            callback: None,
        })
    }

    /// Use a caller-supplied HTTP client for every cycle
    pub fn with_client(mut self, client: Client) -> Self {
        self.fetcher = FeedFetcher::with_client(client, self.collector.config());
        self
    }

    pub fn with_callback(mut self, callback: BatchCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    /// Run one fetch-and-dedupe cycle.
    ///
    /// Seen keys are only recorded once the whole batch has arrived, so a
    /// cycle dropped mid-fetch marks nothing as seen.
    pub async fn poll_once(&self) -> Vec<NormalizedItem> {
        let fetched = self.collector.collect(&self.fetcher).await;
        let total = fetched.len();
        let fresh = self.collector.dedupe(fetched);
        info!("Poll cycle: {} fetched, {} new", total, fresh.len());
        fresh
    }

    /// Turn the poller into an endless stream of non-empty batches.
    ///
    /// The first cycle starts immediately. The stream ends when `shutdown`
    /// becomes `true`, whether the poller is sleeping or mid-fetch.
    pub fn into_stream(
        self,
        shutdown: watch::Receiver<bool>,
    ) -> impl Stream<Item = Vec<NormalizedItem>> + Send {
        info!(
            "Poller started: {} sources, interval={}s",
            self.collector.sources().len(),
            self.interval.as_secs()
        );

        let state = PollState {
            poller: self,
            shutdown,
            started: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if state.started {
                    tokio::select! {
                        _ = tokio::time::sleep(state.poller.interval) => {}
                        _ = shutdown_requested(&mut state.shutdown) => {
                            info!("Poller received shutdown signal");
                            return None;
                        }
                    }
                }
                state.started = true;

                let batch = tokio::select! {
                    batch = state.poller.poll_once() => batch,
                    _ = shutdown_requested(&mut state.shutdown) => {
                        info!("Poller received shutdown signal during fetch");
                        return None;
                    }
                };

                if batch.is_empty() {
                    debug!("No new items this cycle");
                    continue;
                }

                state.poller.notify(&batch);
                return Some((batch, state));
            }
        })
    }

    /// Run the callback; its failures and panics are logged and swallowed
    fn notify(&self, batch: &[NormalizedItem]) {
        let Some(ref callback) = self.callback else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| callback(batch))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Poll callback failed: {:#}", e),
            Err(_) => warn!("Poll callback panicked"),
        }
    }
}

struct PollState {
    poller: Poller,
    shutdown: watch::Receiver<bool>,
    started: bool,
}

/// Resolves once shutdown is signalled; a dropped sender never resolves
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::CollectorConfig;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::timeout;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(guids: &[&str]) -> String {
        let items: String = guids
            .iter()
            .map(|g| format!("<item><title>{g}</title><guid>{g}</guid></item>"))
            .collect();
        format!(r#"<rss version="2.0"><channel>{items}</channel></rss>"#)
    }

    async fn feed_server(body: String) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn collector_for(server: &MockServer) -> Arc<Collector> {
        Arc::new(
            Collector::new(vec![format!("{}/feed", server.uri())], CollectorConfig::default())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_first_batch_is_yielded() {
        let server = feed_server(rss(&["a", "b"])).await;
        let (_tx, rx) = watch::channel(false);

        let poller = Poller::new(collector_for(&server), Duration::from_secs(60)).unwrap();
        let mut stream = Box::pin(poller.into_stream(rx));

        let batch = timeout(Duration::from_secs(5), stream.next())
            .await
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = batch.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_second_cycle_yields_only_new_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(&["a"])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(&["a", "b"])))
            .mount(&server)
            .await;

        let (_tx, rx) = watch::channel(false);
        let poller = Poller::new(collector_for(&server), Duration::ZERO).unwrap();
        let mut stream = Box::pin(poller.into_stream(rx));

        let first = timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, "a");

        let second = timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "b");
    }

    #[tokio::test]
    async fn test_callback_error_does_not_stop_loop() {
        let server = feed_server(rss(&["a"])).await;
        let (_tx, rx) = watch::channel(false);

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let poller = Poller::new(collector_for(&server), Duration::from_secs(60))
            .unwrap()
            .with_callback(Arc::new(move |batch: &[NormalizedItem]| -> anyhow::Result<()> {
                counter.fetch_add(batch.len(), Ordering::SeqCst);
                anyhow::bail!("downstream unavailable")
            }));
        let mut stream = Box::pin(poller.into_stream(rx));

        let batch = timeout(Duration::from_secs(5), stream.next()).await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_callback_panic_is_contained() {
        let server = feed_server(rss(&["a"])).await;
        let (_tx, rx) = watch::channel(false);

        let poller = Poller::new(collector_for(&server), Duration::from_secs(60))
            .unwrap()
            .with_callback(Arc::new(|_: &[NormalizedItem]| -> anyhow::Result<()> {
                panic!("callback bug")
            }));
        let mut stream = Box::pin(poller.into_stream(rx));

        let batch = timeout(Duration::from_secs(5), stream.next()).await.unwrap();
        assert!(batch.is_some());
    }

    #[tokio::test]
    async fn test_shutdown_during_sleep_ends_stream() {
        let server = feed_server(rss(&["a"])).await;
        let (tx, rx) = watch::channel(false);

        let poller = Poller::new(collector_for(&server), Duration::from_secs(3600)).unwrap();
        let mut stream = Box::pin(poller.into_stream(rx));

        assert!(stream.next().await.is_some());
        tx.send(true).unwrap();

        let next = timeout(Duration::from_secs(1), stream.next()).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_during_fetch_marks_nothing_seen() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(rss(&["a"]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let collector = collector_for(&server);
        let (tx, rx) = watch::channel(false);
        let poller = Poller::new(Arc::clone(&collector), Duration::from_secs(60)).unwrap();
        let mut stream = Box::pin(poller.into_stream(rx));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let next = timeout(Duration::from_secs(2), stream.next()).await.unwrap();
        assert!(next.is_none());
        assert_eq!(collector.seen_count(), 0);
    }

    #[tokio::test]
    async fn test_poll_once_drops_untrackable_items() {
        let body = r#"<rss version="2.0"><channel>
            <item><description>no id, link or title</description></item>
            <item><guid>kept</guid></item>
        </channel></rss>"#;
        let server = feed_server(body.to_string()).await;

        let poller = Poller::new(collector_for(&server), Duration::from_secs(60)).unwrap();
        let batch = poller.poll_once().await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, "kept");
        assert!(poller.poll_once().await.is_empty());
    }

    #[test]
    fn test_interval_floor() {
        let collector =
            Arc::new(Collector::new(vec!["https://example.com/feed"], CollectorConfig::default()).unwrap());
        let poller = Poller::new(collector, Duration::from_millis(10)).unwrap();
        assert_eq!(poller.interval(), MIN_POLL_INTERVAL);
    }
}
