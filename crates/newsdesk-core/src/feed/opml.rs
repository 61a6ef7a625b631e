use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::models::Source;
use crate::{Error, Result};

/// Parse an OPML file into sources
pub fn parse_opml_file(path: &Path) -> Result<Vec<Source>> {
    let content = std::fs::read_to_string(path)?;
    parse_opml(&content)
}

/// Parse OPML content into sources.
///
/// Outlines with an `xmlUrl` become sources; the titles of the outlines
/// enclosing them become their tags, outermost first.
pub fn parse_opml(content: &str) -> Result<Vec<Source>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut sources = Vec::new();
    // One entry per open <outline>; None for feed outlines that have children
    let mut categories: Vec<Option<String>> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"outline" => {
                let outline = Outline::from_element(&e);
                match outline.xml_url {
                    Some(url) => {
                        sources.push(source_for(url, outline.label, &categories));
                        categories.push(None);
                    }
                    None => categories.push(outline.label),
                }
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"outline" => {
                let outline = Outline::from_element(&e);
                if let Some(url) = outline.xml_url {
                    sources.push(source_for(url, outline.label, &categories));
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"outline" => {
                categories.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Markup(format!("Failed to parse OPML: {}", e)));
            }
            _ => {}
        }
    }

    Ok(sources)
}

struct Outline {
    xml_url: Option<String>,
    label: Option<String>,
}

impl Outline {
    fn from_element(e: &BytesStart<'_>) -> Self {
        let mut xml_url = None;
        let mut title = None;
        let mut text = None;

        for attr in e.attributes().flatten() {
            let value = attr
                .unescape_value()
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).trim().to_string());
            if value.is_empty() {
                continue;
            }
            match attr.key.as_ref() {
                b"xmlUrl" => xml_url = Some(value),
                b"title" => title = Some(value),
                b"text" => text = Some(value),
                _ => {}
            }
        }

        Self {
            xml_url,
            label: title.or(text),
        }
    }
}

fn source_for(url: String, name: Option<String>, categories: &[Option<String>]) -> Source {
    let tags = categories.iter().flatten().cloned().collect();
    Source::new(url).with_name(name).with_tags(tags)
}
