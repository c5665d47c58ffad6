// src/error.rs
// =============================================================================
// Error types for the crawl-and-scan engine.
//
// Two families:
// - CrawlError: per-task failures. They are reported to the error sink and
//   the task is dropped, but the crawl keeps going.
// - RunError: the only fatal failures. They happen before the Frontier is
//   populated (bad seed, unreachable seed, bad configuration).
//
// Rust concepts:
// - thiserror: derive Display and std::error::Error from attributes
// - #[from]: automatic conversion so the ? operator works across types
// =============================================================================

use serde::Serialize;
use std::fmt;
use thiserror::Error;

// Why a transport-level request failed
//
// This mirrors how reqwest reports failures (timeout, DNS, TLS, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportFailure {
    /// Request timed out
    Timeout,
    /// Could not resolve hostname
    Dns,
    /// Connection refused or reset
    Connect,
    /// SSL/TLS certificate error
    Tls,
    /// Too many redirects (redirect loop)
    TooManyRedirects,
    /// Anything else the transport reported
    Other,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportFailure::Timeout => "timeout",
            TransportFailure::Dns => "dns",
            TransportFailure::Connect => "connect",
            TransportFailure::Tls => "tls",
            TransportFailure::TooManyRedirects => "too many redirects",
            TransportFailure::Other => "other",
        };
        f.write_str(label)
    }
}

// A failure reported by the Transport collaborator
#[derive(Debug, Clone, Error)]
#[error("{kind}: {detail}")]
pub struct TransportError {
    pub kind: TransportFailure,
    pub detail: String,
}

impl TransportError {
    pub fn new(kind: TransportFailure, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

// A failure that only affects one crawl task
#[derive(Debug, Clone, Error)]
pub enum CrawlError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    #[error("detection failed: {0}")]
    Detection(String),
}

impl CrawlError {
    pub fn malformed(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        CrawlError::MalformedUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CrawlError::Transport(_) => ErrorKind::Transport,
            CrawlError::Http { .. } => ErrorKind::Http,
            CrawlError::MalformedUrl { .. } => ErrorKind::MalformedUrl,
            CrawlError::Detection(_) => ErrorKind::Detection,
        }
    }
}

// The category tag that travels to the error sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transport,
    Http,
    MalformedUrl,
    Detection,
}

// Fatal errors: the crawl never starts (or stops at the seed)
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidSeed { url: String, reason: String },

    #[error("seed URL '{url}' could not be fetched: {source}")]
    SeedUnreachable {
        url: String,
        #[source]
        source: CrawlError,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
