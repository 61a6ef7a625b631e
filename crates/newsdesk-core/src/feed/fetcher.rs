use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy};

use crate::config::FetchConfig;
use crate::{Error, Result};

const MAX_REDIRECTS: usize = 10;

/// Settings shared by every fetch a collector performs
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub timeout: Duration,
    /// Upper bound on simultaneous fetches (values below 1 are raised to 1)
    pub concurrency: usize,
    pub user_agent: String,
    pub max_body_bytes: usize,
    pub proxy_url: Option<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for CollectorConfig {
    fn from(fetch: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(fetch.timeout_secs),
            concurrency: fetch.concurrency,
            user_agent: fetch.user_agent.clone(),
            max_body_bytes: fetch.max_body_bytes,
            proxy_url: fetch.proxy_url.clone(),
        }
    }
}

impl CollectorConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Reject settings that would only fail once requests are in flight
    pub(crate) fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::Config("max_body_bytes must be greater than zero".to_string()));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(Error::Config(format!("Invalid User-Agent: {:?}", self.user_agent)));
        }
        if let Some(ref proxy) = self.proxy_url {
            Proxy::all(proxy).map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
        }
        Ok(())
    }
}

/// HTTP retrieval of raw feed documents
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    headers: HeaderMap,
    timeout: Duration,
    max_body_bytes: usize,
}

impl FeedFetcher {
    /// Create a fetcher that owns a freshly built client
    pub fn new(config: &CollectorConfig) -> Result<Self> {
        let client = Self::build_client(config)?;
        Ok(Self::with_client(client, config))
    }

    /// Create a fetcher around a caller-supplied client
    pub fn with_client(client: Client, config: &CollectorConfig) -> Self {
        Self {
            client,
            headers: Self::build_headers(&config.user_agent),
            timeout: config.timeout,
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Build HTTP client with optional proxy
    fn build_client(config: &CollectorConfig) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(ref proxy) = config.proxy_url {
            let proxy = Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
            tracing::info!("Using HTTP proxy for feed fetching");
        }

        builder.build().map_err(Error::Http)
    }

    fn build_headers(user_agent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.9,*/*;q=0.8",
            ),
        );
        if let Ok(ua) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers
    }

    /// GET a document and return its body as text.
    ///
    /// Non-2xx statuses and bodies over the size limit are errors. The body
    /// is decoded with the charset from `Content-Type`, else the XML
    /// declaration's `encoding`, else UTF-8.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching feed from: {}", url);

        let mut response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if let Some(len) = response.content_length() {
            self.ensure_content_size(len as usize, url)?;
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            self.ensure_content_size(body.len().saturating_add(chunk.len()), url)?;
            body.extend_from_slice(&chunk);
        }

        Ok(decode_body(&body, content_type.as_deref()))
    }

    fn ensure_content_size(&self, size: usize, url: &str) -> Result<()> {
        if size > self.max_body_bytes {
            return Err(Error::BodyTooLarge {
                url: url.to_string(),
                size,
            });
        }
        Ok(())
    }
}

/// Decode a fetched body. A byte-order mark overrides any declared charset;
/// undecodable bytes become U+FFFD.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .or_else(|| xml_declared_encoding(body))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        tracing::debug!("Body had bytes invalid in {}", used.name());
    }
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(|c| c == '"' || c == '\'').as_bytes())
    })
}

/// `encoding` pseudo-attribute of a leading `<?xml ...?>` declaration
fn xml_declared_encoding(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(1024)];
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let start = head.iter().position(|b| !b.is_ascii_whitespace())?;
    let decl = head[start..].strip_prefix(b"<?xml")?;
    let end = decl.windows(2).position(|w| w == b"?>")?;
    let decl = &decl[..end];

    let at = decl.windows(8).position(|w| w == b"encoding")?;
    let rest = decl[at + 8..].trim_ascii_start().strip_prefix(b"=")?.trim_ascii_start();
    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let close = rest.iter().position(|&b| b == quote)?;
    Encoding::for_label(&rest[..close])
}
