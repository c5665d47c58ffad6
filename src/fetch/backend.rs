// src/fetch/backend.rs
// =============================================================================
// The two interchangeable Fetcher backends.
//
// - SequentialFetcher: one request at a time. Combined with the crawler's
//   single worker it gives a fully deterministic crawl order.
// - ConcurrentFetcher: up to K requests at a time, enforced with a
//   semaphore. Completions interleave, so pages are no longer visited
//   strictly level by level.
//
// Both classify responses the same way: 2xx is a page, anything else is an
// HTTP error, transport failures pass through. Neither retries.
// =============================================================================

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use url::Url;

use super::{FetchedPage, Fetcher, Transport};
use crate::error::{CrawlError, TransportError, TransportFailure};

pub struct SequentialFetcher {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    // Held for the whole request so callers queue up behind each other
    gate: Mutex<()>,
}

impl SequentialFetcher {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            gate: Mutex::new(()),
        }
    }
}

#[async_trait]
impl Fetcher for SequentialFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError> {
        let _gate = self.gate.lock().await;
        fetch_through(self.transport.as_ref(), url, self.timeout).await
    }

    fn concurrency(&self) -> usize {
        1
    }
}

pub struct ConcurrentFetcher {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    limit: usize,
    permits: Semaphore,
}

impl ConcurrentFetcher {
    // A limit of 0 is treated as 1
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            transport,
            timeout,
            limit,
            permits: Semaphore::new(limit),
        }
    }
}

#[async_trait]
impl Fetcher for ConcurrentFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            TransportError::new(TransportFailure::Other, "fetcher is shut down")
        })?;
        fetch_through(self.transport.as_ref(), url, self.timeout).await
    }

    fn concurrency(&self) -> usize {
        self.limit
    }
}

// Runs one request and classifies the outcome
//
// The tokio timeout is a hard upper bound in case the transport ignores the
// timeout it was given
async fn fetch_through(
    transport: &dyn Transport,
    url: &Url,
    timeout: Duration,
) -> Result<FetchedPage, CrawlError> {
    let response = tokio::time::timeout(timeout, transport.get(url, timeout))
        .await
        .map_err(|_| {
            TransportError::new(
                TransportFailure::Timeout,
                format!("no response within {:?}", timeout),
            )
        })??;

    if !(200..300).contains(&response.status) {
        return Err(CrawlError::Http {
            status: response.status,
        });
    }

    Ok(FetchedPage {
        url: url.clone(),
        status: response.status,
        body: response.body,
    })
}
