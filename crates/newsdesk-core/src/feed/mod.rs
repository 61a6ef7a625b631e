mod collector;
mod dedup;
mod fetcher;
pub mod markup;
mod models;
mod opml;
mod parser;

pub use collector::{Collector, SourceOutcome};
pub use dedup::SeenSet;
pub use fetcher::{CollectorConfig, FeedFetcher};
pub use models::{NormalizedItem, Source};
pub use opml::{parse_opml, parse_opml_file};
pub use parser::{detect_format, parse_date, parse_feed, FeedFormat};
