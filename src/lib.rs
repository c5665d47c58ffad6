// src/lib.rs
// =============================================================================
// sqli-crawler: crawls a site and its subdomains to a bounded depth and flags
// pages whose rendered text or attributes contain SQL-ish tokens (quotes,
// semicolons, comment markers).
//
// The detection is a crude lexical trigger, not an injection test.
//
// Modules:
// - crawl: Frontier, ScopePolicy and the Crawler loop
// - fetch: Transport / Fetcher traits, reqwest transport, the two backends
// - scan: HTML content + link extraction, the Detector strategy
// - sink: where findings and errors are delivered
// =============================================================================

pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod scan;
pub mod sink;
pub mod telemetry;

pub use config::{CrawlConfig, FetchMode};
pub use crawl::{CrawlReport, CrawlState, Crawler, Frontier, ScopePolicy};
pub use error::{CrawlError, ErrorKind, RunError, TransportError, TransportFailure};
pub use fetch::{ConcurrentFetcher, FetchedPage, Fetcher, HttpTransport, RawResponse, SequentialFetcher, Transport};
pub use scan::{Detector, Finding, HtmlLinkExtractor, LexicalDetector, LinkExtractor, PageContent};
pub use sink::{CollectingSink, ErrorEvent, ErrorSink, FindingSink, JsonLinesSink, LogSink};
