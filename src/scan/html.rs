// src/scan/html.rs
// =============================================================================
// This module turns a fetched HTML body into the two things the engine needs:
// - PageContent: the rendered text nodes and the attributes of every element,
//   which is what the detector scans
// - links: absolute URLs found in <a href> tags, resolved against the page URL
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// Everything returned here is owned data: the parsed document is dropped
// before the caller goes back to awaiting network I/O.
// =============================================================================

use scraper::{Html, Node, Selector};
use url::Url;

// The attributes of one element, in document order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeMap {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl AttributeMap {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    // Serializes as `name=value` pairs separated by spaces
    //
    // No quotes are added, so the serialization itself never contains
    // characters the detector looks for
    pub fn serialize(&self) -> String {
        self.attributes
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// What a page looks like to the detector
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageContent {
    // Non-blank text nodes (script and style contents included)
    pub text_nodes: Vec<String>,
    // One entry per element that carries at least one attribute
    pub elements: Vec<AttributeMap>,
}

impl PageContent {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text_nodes: vec![text.into()],
            elements: Vec::new(),
        }
    }

    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut content = PageContent::default();

        for node in document.root_element().descendants() {
            match node.value() {
                Node::Text(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        content.text_nodes.push(text.to_string());
                    }
                }
                Node::Element(element) => {
                    let map = element
                        .attrs()
                        .fold(AttributeMap::new(element.name()), |map, (name, value)| {
                            map.with(name, value)
                        });
                    if !map.is_empty() {
                        content.elements.push(map);
                    }
                }
                _ => {}
            }
        }

        content
    }
}

// The link-extraction collaborator
//
// Implementations must return absolute URLs, resolved against `base`
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, body: &str, base: &Url) -> Vec<String>;
}

// Extracts links from <a href> tags
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &str, base: &Url) -> Vec<String> {
        extract_html_links(body, base)
    }
}

// Extracts all crawlable links from HTML content
//
// Example:
//   html = "<a href='/docs'>Docs</a>"
//   base = "https://example.com"
//   result = ["https://example.com/docs"]
pub fn extract_html_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    // "a[href]" is a constant selector known to be valid
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_url(base, href))
        .filter(|url| is_crawlable_link(url))
        .collect()
}

// Resolves a possibly-relative href to an absolute URL
//
// Examples:
//   base = "https://example.com/page"
//   href = "/docs" -> Some("https://example.com/docs")
//   href = "../other" -> Some("https://example.com/other")
//   href = "#section" -> None (same page)
fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    // join() handles both absolute and relative references
    base.join(href).ok().map(|url| url.to_string())
}

// Only http/https links lead to pages we can fetch
//
// We skip mailto:, tel:, javascript:, data: and file: links
fn is_crawlable_link(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
