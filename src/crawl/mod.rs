// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Breadth-first crawling starting from a seed URL
// - Stays on the seed's registrable domain and its subdomains
// - Configurable depth limit
// - Each URL fetched at most once, even with many workers
// - Sequential or bounded-concurrent execution through the same loop
// =============================================================================

mod engine;
mod frontier;
mod scope;

pub use engine::{CrawlReport, CrawlState, Crawler};
pub use frontier::{normalize, CrawlTask, Frontier};
pub use scope::ScopePolicy;
