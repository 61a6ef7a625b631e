use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed too large ({size} bytes) for URL: {url}")]
    BodyTooLarge { url: String, size: usize },

    #[error("Malformed document: {0}")]
    Markup(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
