//! HTTP fetcher backed by reqwest.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::FetcherConfig;

use super::{FetchError, FetchOutcome, Fetcher};

/// Longest body excerpt kept as a payload summary.
const SUMMARY_MAX_CHARS: usize = 80;

/// Fetches targets with a plain GET.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a new HttpFetcher with the given configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, target: &str) -> Result<FetchOutcome, FetchError> {
        debug!(target = target, "Sending request");

        let response = self.client.get(target).send().await.map_err(|e| {
            if e.is_builder() {
                FetchError::InvalidTarget(format!("{}: {}", target, e))
            } else if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::ConnectionFailed(e.to_string())
            } else {
                FetchError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Request(format!("Failed to read response: {}", e))
            }
        })?;

        debug!(target = target, status = status.as_u16(), "Response received");

        Ok(FetchOutcome {
            status: status.as_u16(),
            summary: summarize_payload(&body),
            body_bytes: body.len(),
        })
    }
}

/// Reduce a response body to a short summary.
///
/// Endpoints that echo request headers (httpbin style) carry an
/// `X-Amzn-Trace-Id`; that id is used when present. Otherwise the summary is
/// the start of the body with whitespace collapsed.
pub fn summarize_payload(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(trace_id) = json
            .pointer("/headers/X-Amzn-Trace-Id")
            .and_then(|v| v.as_str())
        {
            return trace_id.to_string();
        }
    }

    body.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SUMMARY_MAX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned response on a random local port.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut read = 0;
            loop {
                let n = socket.read(&mut buf[read..]).await.unwrap();
                if n == 0 {
                    break;
                }
                read += n;
                if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/delay/0", addr)
    }

    fn local_fetcher() -> HttpFetcher {
        HttpFetcher::with_client(
            Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_summarize_trace_id() {
        let body = r#"{"args": {}, "headers": {"Host": "httpbin.org", "X-Amzn-Trace-Id": "Root=1-abc-def"}, "url": "http://httpbin.org/delay/2"}"#;
        assert_eq!(summarize_payload(body), "Root=1-abc-def");
    }

    #[test]
    fn test_summarize_falls_back_to_excerpt() {
        assert_eq!(summarize_payload("  hello\n   world  "), "hello world");

        let long = "x".repeat(500);
        assert_eq!(summarize_payload(&long).len(), SUMMARY_MAX_CHARS);

        assert_eq!(summarize_payload(r#"{"headers": {}}"#), r#"{"headers": {}}"#);
    }

    #[test]
    fn test_new_from_config() {
        let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();
        assert_eq!(fetcher.name(), "http");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let url = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"headers": {"X-Amzn-Trace-Id": "Root=1-local"}}"#,
        )
        .await;

        let outcome = local_fetcher().fetch(&url).await.unwrap();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.summary, "Root=1-local");
        assert!(outcome.body_bytes > 0);
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;

        let err = local_fetcher().fetch(&url).await.unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                status: 503,
                body: "busy".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_invalid_target() {
        let err = local_fetcher().fetch("not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget(_)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop to get a port nobody is listening on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = local_fetcher()
            .fetch(&format!("http://127.0.0.1:{}/delay/0", port))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ConnectionFailed(_)));
        assert!(err.is_retryable());
    }
}
