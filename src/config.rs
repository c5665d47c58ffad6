// src/config.rs
// =============================================================================
// Run configuration for one crawl.
//
// The CLI fills this in (see cli.rs); library users can build it directly.
// The mode is chosen once at the start of a run and never changes.
// =============================================================================

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RunError;
use crate::fetch::{ConcurrentFetcher, Fetcher, SequentialFetcher, Transport};

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

// How pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// One request at a time, deterministic order
    #[default]
    Sequential,
    /// Up to `concurrency` requests at a time
    Concurrent,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchMode::Sequential => f.write_str("sequential"),
            FetchMode::Concurrent => f.write_str("concurrent"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub seed: String,
    pub max_depth: usize,
    pub mode: FetchMode,
    // Only used in concurrent mode
    pub concurrency: usize,
    pub request_timeout: Duration,
}

impl CrawlConfig {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            max_depth: DEFAULT_MAX_DEPTH,
            mode: FetchMode::Sequential,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.concurrency == 0 {
            return Err(RunError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(RunError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    // Picks the fetcher backend for the configured mode
    pub fn build_fetcher(&self, transport: Arc<dyn Transport>) -> Arc<dyn Fetcher> {
        match self.mode {
            FetchMode::Sequential => {
                Arc::new(SequentialFetcher::new(transport, self.request_timeout))
            }
            FetchMode::Concurrent => Arc::new(ConcurrentFetcher::new(
                transport,
                self.request_timeout,
                self.concurrency,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{TransportError, TransportFailure};
    use crate::fetch::RawResponse;
    use async_trait::async_trait;
    use url::Url;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn get(&self, _url: &Url, _timeout: Duration) -> Result<RawResponse, TransportError> {
            Err(TransportError::new(TransportFailure::Other, "offline"))
        }
    }

    #[test]
    fn test_defaults() {
        let config = CrawlConfig::new("http://example.com");
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.mode, FetchMode::Sequential);
        assert_eq!(config.concurrency, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = CrawlConfig::new("http://example.com");
        config.concurrency = 0;
        assert!(matches!(config.validate(), Err(RunError::InvalidConfig(_))));
    }

    #[test]
    fn test_fetcher_matches_mode() {
        let mut config = CrawlConfig::new("http://example.com");
        // Sequential ignores the concurrency setting
        config.concurrency = 4;
        assert_eq!(config.build_fetcher(Arc::new(NoTransport)).concurrency(), 1);

        config.mode = FetchMode::Concurrent;
        assert_eq!(config.build_fetcher(Arc::new(NoTransport)).concurrency(), 4);
    }
}
