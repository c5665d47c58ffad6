// src/scan/mod.rs
// =============================================================================
// This module contains the page-level logic: turning HTML into scannable
// content and links, and running the detector over it.
//
// Submodules:
// - html: Extracts page content and links from HTML pages
// - detector: The Detector strategy and the default lexical heuristic
// =============================================================================

mod detector;
mod html;

pub use detector::{Detector, Finding, LexicalDetector, DEFAULT_PATTERN};
pub use html::{extract_html_links, AttributeMap, HtmlLinkExtractor, LinkExtractor, PageContent};
