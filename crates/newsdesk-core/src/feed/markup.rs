//! Generic markup tree used by the feed parsers.
//!
//! Documents are read with `quick-xml`'s namespace-aware reader into a small
//! owned tree. Element and attribute names are stored in Clark notation
//! (`{namespace-uri}local`), so a lookup never depends on which prefix a
//! publisher happened to pick. Text is kept the way mixed content arrives:
//! each element has the text before its first child and a tail with the
//! text that follows its own end tag.

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use crate::{Error, Result};

/// Deepest element nesting `parse_document` accepts
pub const MAX_DEPTH: usize = 512;

/// The capabilities the parsers need from a tree node
pub trait MarkupNode: Sized {
    /// Qualified tag, `{ns}local` or just `local`
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
    /// Text before the first child element
    fn text(&self) -> Option<&str>;
    /// Text after this element's end tag, up to the next sibling
    fn tail(&self) -> Option<&str>;
    fn children(&self) -> &[Self];

    fn local_name(&self) -> &str {
        strip_ns(self.tag())
    }

    /// First direct child with the given qualified tag
    fn find(&self, tag: &str) -> Option<&Self> {
        self.children().iter().find(|c| c.tag() == tag)
    }

    /// All direct children with the given qualified tag, in document order
    fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children().iter().filter(move |c| c.tag() == tag)
    }
}

/// Owned element produced by [`parse_document`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    fn push_text(&mut self, chunk: &str) {
        let slot = match self.children.last_mut() {
            Some(last) => &mut last.tail,
            None => &mut self.text,
        };
        slot.get_or_insert_with(String::new).push_str(chunk);
    }
}

impl MarkupNode for Element {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}

/// Strip a `{namespace}` prefix from a qualified tag
pub fn strip_ns(tag: &str) -> &str {
    match tag.strip_prefix('{').and_then(|rest| rest.split_once('}')) {
        Some((_, local)) => local,
        None => tag,
    }
}

/// Builds qualified lookup keys for bare local names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace(Option<String>);

impl Namespace {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(Some(uri.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// The namespace declared on `root`'s own tag, if any
    pub fn of<N: MarkupNode>(root: &N) -> Self {
        root.tag()
            .strip_prefix('{')
            .and_then(|rest| rest.split_once('}'))
            .map(|(uri, _)| Self::new(uri))
            .unwrap_or_default()
    }

    pub fn uri(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn qualify(&self, local: &str) -> String {
        match &self.0 {
            Some(uri) => format!("{{{}}}{}", uri, local),
            None => local.to_string(),
        }
    }
}

/// Concatenate an element's text, its descendants' text and tails, and its own tail.
/// Returns an empty string for a missing element.
pub fn flatten_text<N: MarkupNode>(node: Option<&N>) -> String {
    let Some(node) = node else {
        return String::new();
    };
    let mut out = String::new();
    collect_inner(node, &mut out);
    if let Some(tail) = node.tail() {
        out.push_str(tail);
    }
    out.trim().to_string()
}

fn collect_inner<N: MarkupNode>(node: &N, out: &mut String) {
    if let Some(text) = node.text() {
        out.push_str(text);
    }
    for child in node.children() {
        collect_inner(child, out);
        if let Some(tail) = child.tail() {
            out.push_str(tail);
        }
    }
}

/// Parse a complete document and return its root element
pub fn parse_document(input: &str) -> Result<Element> {
    let input = input.trim_start_matches('\u{feff}');
    let mut reader = NsReader::from_str(input);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| Error::Markup(e.to_string()))?;
        let namespace = namespace_uri(&resolved)?;

        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(Error::Markup("junk after document element".to_string()));
                }
                // Tree walks and drops recurse per level
                if stack.len() >= MAX_DEPTH {
                    return Err(Error::Markup("document nested too deeply".to_string()));
                }
                let local = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                let mut element = Element::new(qualified(namespace, local));

                for attr in start.attributes() {
                    let attr = attr.map_err(|e| Error::Markup(e.to_string()))?;
                    if attr.key.as_namespace_binding().is_some() {
                        continue;
                    }
                    let (attr_ns, attr_local) = reader.resolve_attribute(attr.key);
                    let attr_ns = namespace_uri(&attr_ns)?;
                    let key = qualified(
                        attr_ns,
                        String::from_utf8_lossy(attr_local.as_ref()).into_owned(),
                    );
                    let value = attr
                        .unescape_value()
                        .map_err(|e| Error::Markup(e.to_string()))?
                        .into_owned();
                    element.attributes.push((key, value));
                }

                stack.push(element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Markup("unexpected end tag".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| Error::Markup(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                append_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and DOCTYPE carry no content
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Markup(format!("unclosed element <{}>", strip_ns(&open.tag))));
    }
    root.ok_or_else(|| Error::Markup("no element found".to_string()))
}

fn append_text(stack: &mut [Element], chunk: &str) -> Result<()> {
    match stack.last_mut() {
        Some(current) => {
            current.push_text(chunk);
            Ok(())
        }
        None if chunk.trim().is_empty() => Ok(()),
        None => Err(Error::Markup("text outside of the document element".to_string())),
    }
}

fn namespace_uri(resolved: &ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(String::from_utf8_lossy(ns.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Markup(format!(
            "unbound prefix '{}'",
            String::from_utf8_lossy(prefix)
        ))),
    }
}

fn qualified(namespace: Option<String>, local: String) -> String {
    match namespace {
        Some(uri) => format!("{{{}}}{}", uri, local),
        None => local,
    }
}
