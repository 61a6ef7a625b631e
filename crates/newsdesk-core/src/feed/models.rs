use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Maximum summary length (chars) in an item digest
const DIGEST_SUMMARY_CHARS: usize = 300;

/// A remote RSS/Atom endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub name: Option<String>,
    /// Attached, in order, to every item this source produces
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Source {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            tags: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Name for log lines and listings
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

impl From<&str> for Source {
    fn from(url: &str) -> Self {
        Source::new(url)
    }
}

impl From<String> for Source {
    fn from(url: String) -> Self {
        Source::new(url)
    }
}

/// One article or entry, regardless of the format it was published in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// guid / entry id, else link, else title; fixed at parse time
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary: Option<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub source_url: String,
    pub source_name: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NormalizedItem {
    /// Identity used by the deduplicator: `id`, else `link`.
    /// Empty when the item cannot be tracked.
    pub fn dedup_key(&self) -> &str {
        if self.id.is_empty() {
            &self.link
        } else {
            &self.id
        }
    }

    /// Summary rendered as plain text
    pub fn summary_text(&self) -> String {
        match self.summary.as_deref() {
            Some(summary) => html_to_text(summary).trim().to_string(),
            None => String::new(),
        }
    }

    /// Three-line rendering: "timestamp | title", summary, link
    pub fn digest(&self) -> String {
        let ts = self
            .published_at
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        let summary = truncate_chars(&self.summary_text(), DIGEST_SUMMARY_CHARS);
        format!("{} | {}\n{}\n{}", ts, self.title, summary, self.link)
    }
}

/// Truncate to `max_chars`, replacing the tail with "..." when shortened
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

/// Convert HTML content to plain text
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 10_000).unwrap_or_else(|_| html.to_string())
}
