// src/fetch/mod.rs
// =============================================================================
// This module is the boundary between the engine and the network.
//
// Two layers:
// - Transport: "GET this URL within this timeout, give me status + body".
//   HttpTransport (reqwest) is the real one; tests plug in mocks.
// - Fetcher: what the crawler talks to. It wraps a Transport, turns non-2xx
//   statuses into errors and decides how many requests may be in flight.
//   SequentialFetcher allows one, ConcurrentFetcher allows K.
//
// Redirects, TLS and connection pooling belong to the Transport.
// =============================================================================

mod backend;
mod http;

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use crate::error::{CrawlError, TransportError};

pub use backend::{ConcurrentFetcher, SequentialFetcher};
pub use http::HttpTransport;

// What the transport hands back for any response, successful or not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

// A page that was fetched with a 2xx status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: Url,
    pub status: u16,
    pub body: String,
}

// The fetch collaborator
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<RawResponse, TransportError>;
}

// What the crawler uses to retrieve a task's page
//
// Failures come back as a CrawlError; they never abort the crawl
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError>;

    // Upper bound on simultaneous fetches; the crawler sizes its worker
    // pool from this
    fn concurrency(&self) -> usize;
}
