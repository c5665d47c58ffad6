// src/fetch/http.rs
// =============================================================================
// The real Transport: plain GET requests with reqwest.
//
// Key functionality:
// - One shared Client (connection pooling across all workers)
// - Redirects followed by reqwest itself, capped at 5
// - reqwest failures sorted into timeout / DNS / connect / TLS / redirect loop
//
// Any status code is returned as-is; deciding that 404 is a failure is the
// Fetcher's job.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{RawResponse, Transport};
use crate::error::{TransportError, TransportFailure};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    // Builds the shared client
    //
    // The per-request timeout is passed on every get() call instead
    pub fn new(user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url, timeout: Duration) -> Result<RawResponse, TransportError> {
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(categorize_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(categorize_error)?;

        Ok(RawResponse { status, body })
    }
}

// Categorizes different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
fn categorize_error(error: reqwest::Error) -> TransportError {
    let error_string = error.to_string();
    let lowered = error_string.to_lowercase();

    let kind = if error.is_timeout() {
        TransportFailure::Timeout
    } else if error.is_redirect() {
        TransportFailure::TooManyRedirects
    } else if error.is_connect() {
        // Connection errors often mean DNS issues or host unreachable
        if lowered.contains("dns") {
            TransportFailure::Dns
        } else {
            TransportFailure::Connect
        }
    } else if lowered.contains("certificate") || lowered.contains("ssl") || lowered.contains("tls") {
        TransportFailure::Tls
    } else {
        TransportFailure::Other
    };

    TransportError::new(kind, error_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Serves a single canned response on a random local port
    async fn serve_once(status_line: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 2048];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    fn transport() -> HttpTransport {
        HttpTransport::new("sqli-crawler-test").unwrap()
    }

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let url = serve_once("200 OK", "<p>hi</p>").await;
        let response = transport().get(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<p>hi</p>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_not_a_transport_error() {
        let url = serve_once("404 Not Found", "missing").await;
        let response = transport().get(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Grab a free port, then close it again
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let err = transport().get(&url, Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.kind, TransportFailure::Connect);
    }

    #[tokio::test]
    async fn test_timeout() {
        // Accepts the connection but never answers
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let err = transport()
            .get(&url, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err.kind, TransportFailure::Timeout);
    }
}
