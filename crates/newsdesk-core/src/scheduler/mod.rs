mod service;

pub use service::{BatchCallback, Poller, MIN_POLL_INTERVAL};
