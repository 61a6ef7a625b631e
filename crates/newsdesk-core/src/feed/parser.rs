use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use html_escape::decode_html_entities;
use url::Url;

use super::markup::{flatten_text, parse_document, MarkupNode, Namespace};
use super::models::{NormalizedItem, Source};
use crate::Result;

const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const RSS1_NS: &str = "http://purl.org/rss/1.0/";

/// Syndication format chosen for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

/// Pick a parser from the root element
pub fn detect_format<N: MarkupNode>(root: &N) -> FeedFormat {
    let local = root.local_name();
    if local.eq_ignore_ascii_case("rss") || local.eq_ignore_ascii_case("rdf") {
        FeedFormat::Rss
    } else if local == "feed" {
        FeedFormat::Atom
    } else if root.find("channel").is_some() {
        FeedFormat::Rss
    } else {
        FeedFormat::Atom
    }
}

/// Parse a fetched document into normalized items.
///
/// Fails only when the body is not well-formed markup. Feeds with no
/// recognizable items yield an empty list.
pub fn parse_feed(body: &str, source: &Source) -> Result<Vec<NormalizedItem>> {
    let root = parse_document(body)?;
    Ok(parse_root(&root, source))
}

/// Normalize an already-parsed document
pub fn parse_root<N: MarkupNode>(root: &N, source: &Source) -> Vec<NormalizedItem> {
    match detect_format(root) {
        FeedFormat::Rss => parse_rss(root, source),
        FeedFormat::Atom => parse_atom(root, source),
    }
}

/// RSS 2.0 (and RSS 1.0 / RDF) items in document order
pub fn parse_rss<N: MarkupNode>(root: &N, source: &Source) -> Vec<NormalizedItem> {
    let ns = if root.local_name().eq_ignore_ascii_case("rdf") {
        Namespace::new(RSS1_NS)
    } else {
        Namespace::none()
    };

    let channel = if root.local_name().eq_ignore_ascii_case("rss") {
        root.find(&ns.qualify("channel"))
    } else {
        Some(root)
    };
    let Some(channel) = channel else {
        return Vec::new();
    };

    let item_tag = ns.qualify("item");
    let title_tag = ns.qualify("title");
    let link_tag = ns.qualify("link");
    let description_tag = ns.qualify("description");
    let encoded_tag = Namespace::new(CONTENT_NS).qualify("encoded");

    channel
        .find_all(&item_tag)
        .map(|item| {
            let title = flatten_text(item.find(&title_tag));
            let link = resolve_link(&flatten_text(item.find(&link_tag)), &source.url);
            let guid = flatten_text(item.find("guid"));
            let id = first_non_empty([guid, link.clone(), title.clone()]);

            let summary = first_non_empty([
                flatten_text(item.find(&description_tag)),
                flatten_text(item.find(&encoded_tag)),
            ]);
            let published_at = parse_date(&flatten_text(item.find("pubDate")));

            let author = flatten_text(item.find("author"));
            let authors = if author.is_empty() { Vec::new() } else { vec![author] };

            let categories = item
                .find_all("category")
                .map(|c| flatten_text(Some(c)))
                .filter(|c| !c.is_empty());

            build_item(id, &title, link, &summary, published_at, source, authors, categories)
        })
        .collect()
}

/// Atom 1.0 entries in document order
pub fn parse_atom<N: MarkupNode>(root: &N, source: &Source) -> Vec<NormalizedItem> {
    let ns = Namespace::of(root);
    let entry_tag = ns.qualify("entry");
    let title_tag = ns.qualify("title");
    let id_tag = ns.qualify("id");
    let summary_tag = ns.qualify("summary");
    let content_tag = ns.qualify("content");
    let published_tag = ns.qualify("published");
    let updated_tag = ns.qualify("updated");
    let author_tag = ns.qualify("author");
    let name_tag = ns.qualify("name");
    let category_tag = ns.qualify("category");
    let term_tag = ns.qualify("term");

    root.find_all(&entry_tag)
        .map(|entry| {
            let title = flatten_text(entry.find(&title_tag));
            let link = alternate_link(entry, &ns)
                .map(|href| resolve_link(&href, &source.url))
                .unwrap_or_default();
            let id = first_non_empty([flatten_text(entry.find(&id_tag)), link.clone(), title.clone()]);

            let summary = first_non_empty([
                flatten_text(entry.find(&summary_tag)),
                flatten_text(entry.find(&content_tag)),
            ]);
            let published_at = parse_date(&first_non_empty([
                flatten_text(entry.find(&published_tag)),
                flatten_text(entry.find(&updated_tag)),
            ]));

            let authors = entry
                .find_all(&author_tag)
                .map(|a| flatten_text(a.find(&name_tag)))
                .filter(|name| !name.is_empty())
                .collect();

            let categories = entry.find_all(&category_tag).map(|c| {
                match c.attr("term").filter(|t| !t.is_empty()) {
                    Some(term) => term.to_string(),
                    None => flatten_text(c.find(&term_tag)),
                }
            });

            build_item(id, &title, link, &summary, published_at, source, authors, categories)
        })
        .collect()
}

/// The entry's HTML alternate link, else the first link's href or text
fn alternate_link<N: MarkupNode>(entry: &N, ns: &Namespace) -> Option<String> {
    let link_tag = ns.qualify("link");
    let links: Vec<&N> = entry.find_all(&link_tag).collect();

    for link in &links {
        let rel = link.attr("rel").unwrap_or("alternate");
        let media_type = link.attr("type").unwrap_or("text/html");
        if rel == "alternate" && media_type.contains("html") {
            if let Some(href) = link.attr("href").filter(|h| !h.is_empty()) {
                return Some(href.to_string());
            }
        }
    }

    let first = links.first()?;
    match first.attr("href").filter(|h| !h.is_empty()) {
        Some(href) => Some(href.to_string()),
        None => Some(flatten_text(Some(*first))).filter(|t| !t.is_empty()),
    }
}

#[allow(clippy::too_many_arguments)]
fn build_item(
    id: String,
    title: &str,
    link: String,
    summary: &str,
    published_at: Option<DateTime<FixedOffset>>,
    source: &Source,
    authors: Vec<String>,
    categories: impl Iterator<Item = String>,
) -> NormalizedItem {
    let summary = if summary.is_empty() {
        None
    } else {
        Some(decode_html_entities(summary).into_owned())
    };

    NormalizedItem {
        id,
        title: decode_html_entities(title).into_owned(),
        link,
        summary,
        published_at,
        source_url: source.url.clone(),
        source_name: source.name.clone(),
        authors,
        tags: source.tags.iter().cloned().chain(categories).collect(),
    }
}

fn first_non_empty<const N: usize>(candidates: [String; N]) -> String {
    candidates
        .into_iter()
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}

/// Absolute links pass through untouched; relative ones are joined onto the feed URL.
fn resolve_link(raw: &str, base: &str) -> String {
    if raw.is_empty() || Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(raw))
        .map(|url| url.to_string())
        .unwrap_or_default()
}

/// Parse an RFC 822/1123 or ISO 8601 timestamp.
/// Values without a zone are taken as UTC; anything else yields `None`.
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    parse_rfc822(value).or_else(|| parse_iso8601(value))
}

fn parse_rfc822(value: &str) -> Option<DateTime<FixedOffset>> {
    // The day-of-week is ignored, even when it disagrees with the date
    let rest = match value.split_once(',') {
        Some((_, rest)) => rest.trim(),
        None => value,
    };
    if let Ok(dt) = DateTime::parse_from_rfc2822(rest) {
        return Some(dt);
    }

    // Missing or unrecognized zone name: read the rest as UTC
    let rest = match rest.rsplit_once(' ') {
        Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head.trim_end(),
        _ => rest,
    };
    ["%d %b %Y %H:%M:%S", "%d %b %Y %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(rest, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

fn parse_iso8601(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.replace('Z', "+00:00");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M%z"] {
        if let Ok(dt) = DateTime::parse_from_str(&value, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&value, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::markup::parse_document;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;

    const FEED_URL: &str = "https://example.com/feed.xml";

    fn source() -> Source {
        Source::new(FEED_URL).with_name(Some("ex".to_string()))
    }

    #[test]
    fn test_parse_minimal_rss() {
        let rss = r#"<rss version="2.0"><channel><item><title>Item 1</title><link>https://example.com/1</link><description>Desc1</description><pubDate>Wed, 02 Oct 2002 08:00:00 GMT</pubDate><guid>id-1</guid></item></channel></rss>"#;
        let root = parse_document(rss).unwrap();
        let items = parse_rss(&root, &source());

        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.id, "id-1");
        assert_eq!(it.title, "Item 1");
        assert_eq!(it.link, "https://example.com/1");
        assert_eq!(it.summary.as_deref(), Some("Desc1"));
        assert_eq!(it.source_url, FEED_URL);
        assert_eq!(it.source_name.as_deref(), Some("ex"));
        let published = it.published_at.unwrap();
        assert_eq!(published.offset().local_minus_utc(), 0);
        assert_eq!(published.year(), 2002);
    }

    #[test]
    fn test_rss_item_count_and_order() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Feed</title>
    <item><title>First</title><guid>1</guid></item>
    <item><title>Second</title><guid>2</guid></item>
    <item><title>Third</title><guid>3</guid></item>
  </channel>
</rss>"#;
        let items = parse_feed(rss, &source()).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_rss_fallbacks_and_extensions() {
        let rss = r#"<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <item>
      <title>Tom &amp;amp; Jerry</title>
      <link>/posts/1</link>
      <content:encoded><![CDATA[<p>Full &eacute;dition</p>]]></content:encoded>
      <author>editor@example.com (Editor)</author>
      <category>World</category>
      <category></category>
      <category>Politics</category>
      <pubDate>not a date</pubDate>
    </item>
    <item>
      <title>Only a title</title>
    </item>
  </channel>
</rss>"#;
        let src = source().with_tags(vec!["america".to_string()]);
        let items = parse_feed(rss, &src).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.title, "Tom & Jerry");
        assert_eq!(first.link, "https://example.com/posts/1");
        assert_eq!(first.id, "https://example.com/posts/1");
        assert_eq!(first.summary.as_deref(), Some("<p>Full \u{e9}dition</p>"));
        assert_eq!(first.authors, vec!["editor@example.com (Editor)"]);
        assert_eq!(first.tags, vec!["america", "World", "Politics"]);
        assert!(first.published_at.is_none());

        let second = &items[1];
        assert_eq!(second.id, "Only a title");
        assert_eq!(second.link, "");
        assert!(second.summary.is_none());
        assert!(second.authors.is_empty());
        assert_eq!(second.tags, vec!["america"]);
    }

    #[test]
    fn test_rss_without_channel_is_empty() {
        let items = parse_feed(r#"<rss version="2.0"/>"#, &source()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_rdf_feed() {
        let rdf = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel rdf:about="https://example.com/"><title>RDF</title></channel>
  <item rdf:about="https://example.com/a"><title>A</title><link>https://example.com/a</link></item>
  <item rdf:about="https://example.com/b"><title>B</title><link>https://example.com/b</link></item>
</rdf:RDF>"#;
        let root = parse_document(rdf).unwrap();
        assert_eq!(detect_format(&root), FeedFormat::Rss);

        let items = parse_root(&root, &source());
        let links: Vec<&str> = items.iter().map(|i| i.link.as_str()).collect();
        assert_eq!(links, vec!["https://example.com/a", "https://example.com/b"]);
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom</title>
  <entry>
    <title type="html">First &lt;em&gt;entry&lt;/em&gt;</title>
    <link rel="self" href="https://example.com/entries/1.atom"/>
    <link rel="alternate" type="text/html" href="https://example.com/entries/1"/>
    <id>urn:uuid:1</id>
    <published>2024-10-31T12:34:56Z</published>
    <updated>2024-11-01T00:00:00Z</updated>
    <summary>Summary one</summary>
    <author><name>Alice</name></author>
    <author><name></name></author>
    <author><name>Bob</name></author>
    <category term="tech"/>
    <category><term>science</term></category>
    <category/>
  </entry>
  <entry>
    <title>Second</title>
    <link href="https://example.com/entries/2"/>
    <updated>2024-11-02T08:00:00+09:00</updated>
    <content type="html">Body two</content>
  </entry>
  <entry>
    <title>Third</title>
    <link rel="enclosure" type="audio/mpeg" href="https://example.com/3.mp3"/>
  </entry>
</feed>"#;

    #[test]
    fn test_atom_entries() {
        let src = source().with_tags(vec!["static".to_string()]);
        let root = parse_document(ATOM).unwrap();
        assert_eq!(detect_format(&root), FeedFormat::Atom);
        let items = parse_atom(&root, &src);
        assert_eq!(items.len(), 3);

        let first = &items[0];
        assert_eq!(first.id, "urn:uuid:1");
        assert_eq!(first.title, "First <em>entry</em>");
        assert_eq!(first.link, "https://example.com/entries/1");
        assert_eq!(first.summary.as_deref(), Some("Summary one"));
        assert_eq!(first.authors, vec!["Alice", "Bob"]);
        assert_eq!(first.tags, vec!["static", "tech", "science", ""]);
        assert_eq!(first.published_at.unwrap().day(), 31);

        let second = &items[1];
        assert_eq!(second.id, "https://example.com/entries/2");
        assert_eq!(second.summary.as_deref(), Some("Body two"));
        let updated = second.published_at.unwrap();
        assert_eq!(updated.offset().local_minus_utc(), 9 * 3600);

        let third = &items[2];
        assert_eq!(third.link, "https://example.com/3.mp3");
        assert_eq!(third.id, "https://example.com/3.mp3");
        assert!(third.published_at.is_none());
    }

    #[test]
    fn test_atom_prefers_alternate_html_link() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
<link rel="self" href="https://example.com/self"/>
<link rel="alternate" type="text/html" href="https://example.com/page"/>
</entry></feed>"#;
        let items = parse_feed(atom, &source()).unwrap();
        assert_eq!(items[0].link, "https://example.com/page");
    }

    #[test]
    fn test_atom_without_namespace() {
        let atom = r#"<feed><entry><title>Plain</title><id>plain-1</id><link>https://example.com/text-link</link></entry></feed>"#;
        let items = parse_feed(atom, &source()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "plain-1");
        assert_eq!(items[0].link, "https://example.com/text-link");
    }

    #[test]
    fn test_atom_with_prefixed_namespace() {
        let atom = r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom"><a:entry><a:title>Prefixed</a:title><a:id>p-1</a:id></a:entry></a:feed>"#;
        let items = parse_feed(atom, &source()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Prefixed");
    }

    #[test]
    fn test_unknown_root_detection() {
        let with_channel = parse_document("<document><channel><item><guid>x</guid></item></channel></document>").unwrap();
        assert_eq!(detect_format(&with_channel), FeedFormat::Rss);
        assert_eq!(parse_root(&with_channel, &source()).len(), 0);

        let without = parse_document("<document><entry><id>y</id></entry></document>").unwrap();
        assert_eq!(detect_format(&without), FeedFormat::Atom);
        let items = parse_root(&without, &source());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "y");
    }

    #[test]
    fn test_malformed_feed_is_error() {
        assert!(parse_feed("<rss><channel>", &source()).is_err());
        assert!(parse_feed("<html><body>Not a feed", &source()).is_err());
    }

    #[test]
    fn test_parse_date_rfc_and_iso() {
        let rfc = parse_date("Wed, 02 Oct 2002 08:00:00 GMT").unwrap();
        assert_eq!(rfc.offset().local_minus_utc(), 0);
        assert_eq!(rfc.hour(), 8);

        let est = parse_date("Wed, 02 Oct 2002 08:00:00 EST").unwrap();
        assert_eq!(est.offset().local_minus_utc(), -5 * 3600);

        let iso = parse_date("2024-10-31T12:34:56Z").unwrap();
        assert_eq!(iso.offset().local_minus_utc(), 0);
        assert_eq!(iso.minute(), 34);
    }

    #[test]
    fn test_parse_date_without_zone_is_utc() {
        let rfc = parse_date("Wed, 02 Oct 2002 08:00:00").unwrap();
        assert_eq!(rfc.offset().local_minus_utc(), 0);

        let naive = parse_date("2024-10-31T12:34:56").unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);

        let date_only = parse_date("2024-10-31").unwrap();
        assert_eq!(date_only.hour(), 0);
    }

    #[test]
    fn test_parse_date_ignores_wrong_weekday() {
        // 2 Oct 2002 was a Wednesday
        let dt = parse_date("Thu, 02 Oct 2002 08:00:00 GMT").unwrap();
        assert_eq!(dt, parse_date("Wed, 02 Oct 2002 08:00:00 GMT").unwrap());

        let offset = parse_date("Mon, 02 Oct 2002 08:00:00 +0900").unwrap();
        assert_eq!(offset.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_parse_date_unknown_zone_name_is_utc() {
        let dt = parse_date("Wed, 02 Oct 2002 08:00:00 KST").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!((dt.day(), dt.hour(), dt.minute()), (2, 8, 0));
    }

    #[test]
    fn test_parse_date_unrecognized_is_none() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("31/10/2024").is_none());
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(resolve_link("https://a.example/x", FEED_URL), "https://a.example/x");
        assert_eq!(resolve_link("/x", FEED_URL), "https://example.com/x");
        assert_eq!(resolve_link("x", "not a url"), "");
        assert_eq!(resolve_link("", FEED_URL), "");
    }
}
