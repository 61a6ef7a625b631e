pub mod catalog;
pub mod config;
pub mod error;
pub mod feed;
pub mod scheduler;

pub use catalog::FeedCatalog;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use feed::{Collector, CollectorConfig, NormalizedItem, Source};
pub use scheduler::Poller;
