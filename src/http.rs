use crate::config::{Config, DEFAULT_USER_AGENT};
use crate::extractor::ExtractError;
use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Status and content type of a HEAD request. Non-2xx statuses are reported
/// here instead of being turned into errors.
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
}

impl HeadResponse {
    pub fn is_audio(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("audio/"))
            .unwrap_or(false)
    }
}

/// Shared HTTP client for every extractor. Cloning is cheap; clones share
/// the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// A `timeout_secs` of zero would fail every request, so it falls back
    /// to the default timeout.
    pub fn from_config(config: &Config) -> Self {
        let timeout = match config.timeout_secs {
            0 => {
                warn!("timeout_secs must be positive, using {:?}", DEFAULT_TIMEOUT);
                DEFAULT_TIMEOUT
            }
            secs => Duration::from_secs(secs),
        };
        Self::with_settings(&config.user_agent, timeout)
    }

    pub fn with_settings(user_agent: &str, timeout: Duration) -> Self {
        let client = match Client::builder().user_agent(user_agent).timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!(
                    "Could not build HTTP client ({}), falling back to reqwest defaults without user agent or timeout",
                    e
                );
                Client::default()
            }
        };
        Self { client }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// GET a page body, failing on transport errors and non-2xx statuses.
    pub async fn get_text(&self, url: &str) -> Result<String, ExtractError> {
        debug!("GET {}", url);
        let resp = self.client.get(url).send().await?.error_for_status()?;
        Ok(resp.text().await?)
    }

    /// GET and decode a JSON document. A body that does not decode is a
    /// content error, not a network one.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ExtractError> {
        debug!("GET {} (json)", url);
        let resp = self.client.get(url).send().await?.error_for_status()?;
        resp.json::<T>().await.map_err(|e| {
            if e.is_decode() {
                ExtractError::Content(format!("bad JSON from {}: {}", url, e))
            } else {
                ExtractError::from(e)
            }
        })
    }

    /// GET a page body, returning `None` for non-2xx statuses.
    pub async fn try_get_text(&self, url: &str) -> Result<Option<String>, ExtractError> {
        debug!("GET {} (status checked by caller)", url);
        let resp = self.client.get(url).send().await?;
        if !resp.status().is_success() {
            debug!("GET {} returned {}", url, resp.status());
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }

    /// GET only the first `len` bytes of a resource. Servers that ignore the
    /// `Range` header are read until `len` bytes arrive and then dropped.
    pub async fn get_range(&self, url: &str, len: u64) -> Result<Vec<u8>, ExtractError> {
        debug!("GET {} (first {} bytes)", url, len);
        let resp = self
            .client
            .get(url)
            .header(RANGE, format!("bytes=0-{}", len.saturating_sub(1)))
            .send()
            .await?
            .error_for_status()?;

        let limit = usize::try_from(len).unwrap_or(usize::MAX);
        let mut data = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            let take = chunk.len().min(limit - data.len());
            data.extend_from_slice(&chunk[..take]);
            if data.len() >= limit {
                break;
            }
        }
        Ok(data)
    }

    pub async fn head(&self, url: &str) -> Result<HeadResponse, ExtractError> {
        debug!("HEAD {}", url);
        let resp = self.client.head(url).send().await?;
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        Ok(HeadResponse {
            status: resp.status(),
            content_type,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ErrorKind;
    use httpmock::prelude::*;
    use httpmock::Method::HEAD;

    #[tokio::test]
    async fn test_get_text_sends_client_identifier() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/page")
                .header("user-agent", DEFAULT_USER_AGENT);
            then.status(200).body("hello");
        });

        let body = HttpClient::new().get_text(&server.url("/page")).await.unwrap();
        mock.assert();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_get_text_fails_on_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404);
        });

        let err = HttpClient::new()
            .get_text(&server.url("/missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NetworkFailure);
    }

    #[tokio::test]
    async fn test_try_get_text_reports_error_status_as_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(410);
        });

        let body = HttpClient::new()
            .try_get_text(&server.url("/gone"))
            .await
            .unwrap();
        assert!(body.is_none());
    }

    #[tokio::test]
    async fn test_get_range_sends_range_header() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/a.mp3").header("range", "bytes=0-9");
            then.status(206).body("0123456789");
        });

        let data = HttpClient::new()
            .get_range(&server.url("/a.mp3"), 10)
            .await
            .unwrap();
        mock.assert();
        assert_eq!(data, b"0123456789");
    }

    #[tokio::test]
    async fn test_get_range_stops_when_range_is_ignored() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/big.mp3");
            then.status(200).body(vec![7u8; 2 * 1024 * 1024]);
        });

        let data = HttpClient::new()
            .get_range(&server.url("/big.mp3"), 128 * 1024)
            .await
            .unwrap();
        assert_eq!(data.len(), 128 * 1024);
        assert!(data.iter().all(|&b| b == 7));
    }

    #[tokio::test]
    async fn test_zero_timeout_from_config_still_fetches() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/page");
            then.status(200).body("ok");
        });

        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        let body = HttpClient::from_config(&config)
            .get_text(&server.url("/page"))
            .await
            .unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_head_does_not_fail_on_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(HEAD).path("/a.mp3");
            then.status(404).header("content-type", "text/html");
        });

        let head = HttpClient::new().head(&server.url("/a.mp3")).await.unwrap();
        assert_eq!(head.status, StatusCode::NOT_FOUND);
        assert!(!head.is_audio());
    }
}
