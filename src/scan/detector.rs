// src/scan/detector.rs
// =============================================================================
// Page-level detection of SQL-injection-looking output.
//
// The Detector trait is the seam: the crawl loop only knows it can hand over
// a page and get findings back. The default LexicalDetector is a crude
// trigger: it flags any text node or attribute map containing a single
// quote, a double quote, a semicolon, "--" or "/*". That fires on ordinary
// punctuation, inline JavaScript and JSON too. It is a lead for a human to
// look at, not a vulnerability verdict.
// =============================================================================

use regex::Regex;
use serde::Serialize;
use url::Url;

use super::html::PageContent;
use crate::error::CrawlError;

// Characters of context kept on each side of a match
const SNIPPET_RADIUS: usize = 24;

// Quote, double quote, semicolon, SQL line comment, SQL block comment open
pub const DEFAULT_PATTERN: &str = r#"'|"|;|--|/\*"#;

/// One reported instance of the heuristic matching page content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Page the match was found on
    pub url: String,
    /// Snippet around the match
    pub evidence: String,
    /// The token that matched (e.g. `'` or `--`)
    pub token: String,
    /// `text` or `<tag> attributes`
    pub location: String,
}

// A replaceable detection strategy
//
// Implementations must be pure: no network, no filesystem, no shared state.
// They are called from many workers at once.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn scan(&self, url: &Url, content: &PageContent) -> Result<Vec<Finding>, CrawlError>;
}

// The default regex-based heuristic
#[derive(Debug, Clone)]
pub struct LexicalDetector {
    pattern: Regex,
}

impl LexicalDetector {
    pub fn new() -> Self {
        // DEFAULT_PATTERN is a constant known to compile
        Self {
            pattern: Regex::new(DEFAULT_PATTERN).unwrap(),
        }
    }

    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    fn check(&self, url: &Url, haystack: &str, location: &str) -> Option<Finding> {
        let hit = self.pattern.find(haystack)?;
        Some(Finding {
            url: url.to_string(),
            evidence: snippet(haystack, hit.start(), hit.end()),
            token: hit.as_str().to_string(),
            location: location.to_string(),
        })
    }
}

impl Default for LexicalDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for LexicalDetector {
    fn name(&self) -> &str {
        "lexical"
    }

    // One finding per matching text node and per matching attribute map
    fn scan(&self, url: &Url, content: &PageContent) -> Result<Vec<Finding>, CrawlError> {
        let from_text = content
            .text_nodes
            .iter()
            .filter_map(|text| self.check(url, text, "text"));

        let from_attributes = content.elements.iter().filter_map(|element| {
            let location = format!("<{}> attributes", element.tag);
            self.check(url, &element.serialize(), &location)
        });

        Ok(from_text.chain(from_attributes).collect())
    }
}

// Cuts a window of SNIPPET_RADIUS chars around [start, end)
//
// Works on char boundaries so multi-byte text never panics
fn snippet(haystack: &str, start: usize, end: usize) -> String {
    let before: String = haystack[..start]
        .chars()
        .rev()
        .take(SNIPPET_RADIUS)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let after: String = haystack[end..].chars().take(SNIPPET_RADIUS).collect();

    format!("{}{}{}", before, &haystack[start..end], after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::html::AttributeMap;

    fn page() -> Url {
        Url::parse("http://site.test/page").unwrap()
    }

    #[test]
    fn test_flags_quote_and_semicolon() {
        let content = PageContent::from_text("O'Brien; DROP TABLE");
        let findings = LexicalDetector::new().scan(&page(), &content).unwrap();

        assert!(!findings.is_empty());
        assert!(findings
            .iter()
            .all(|f| f.evidence.contains('\'') || f.evidence.contains(';')));
        assert_eq!(findings[0].url, "http://site.test/page");
        assert_eq!(findings[0].token, "'");
    }

    #[test]
    fn test_clean_page_has_no_findings() {
        let content = PageContent {
            text_nodes: vec!["hello world".to_string()],
            elements: vec![AttributeMap::new("img").with("alt", "a picture")],
        };
        let findings = LexicalDetector::new().scan(&page(), &content).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_comment_markers() {
        let detector = LexicalDetector::new();
        for text in ["admin -- ignored", "select /* hint */ 1"] {
            let findings = detector.scan(&page(), &PageContent::from_text(text)).unwrap();
            assert_eq!(findings.len(), 1, "expected a finding for {:?}", text);
        }
        let findings = detector
            .scan(&page(), &PageContent::from_text("a - b / c"))
            .unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_attribute_match_reports_tag() {
        let content = PageContent {
            text_nodes: vec![],
            elements: vec![AttributeMap::new("input").with("value", "1 OR 1=1--")],
        };
        let findings = LexicalDetector::new().scan(&page(), &content).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location, "<input> attributes");
        assert_eq!(findings[0].token, "--");
    }

    // Ordinary punctuation and scripts trigger the heuristic; that is the
    // known false-positive behavior
    #[test]
    fn test_ordinary_punctuation_is_flagged() {
        let html = r#"<p>It's a nice day</p><script>let x = {"a": 1};</script>"#;
        let content = PageContent::from_html(html);
        let findings = LexicalDetector::new().scan(&page(), &content).unwrap();
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_snippet_is_bounded_and_utf8_safe() {
        let text = format!("{}'{}", "é".repeat(100), "ü".repeat(100));
        let findings = LexicalDetector::new()
            .scan(&page(), &PageContent::from_text(text))
            .unwrap();
        let evidence = &findings[0].evidence;
        assert_eq!(evidence.chars().count(), SNIPPET_RADIUS * 2 + 1);
        assert!(evidence.contains('\''));
    }

    #[test]
    fn test_custom_pattern() {
        let detector = LexicalDetector::with_pattern(r"(?i)union\s+select").unwrap();
        let findings = detector
            .scan(&page(), &PageContent::from_text("x UNION  SELECT y"))
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert!(LexicalDetector::with_pattern("(").is_err());
    }
}
