//! HTTP transport handing back raw response text.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, TRANSFER_ENCODING};

/// Capability to issue a GET and return the response as it appeared on the
/// wire: status line, headers, blank line, body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpClient {
    /// Performs a GET request and renders the response as raw HTTP text.
    ///
    /// reqwest has already undone any transfer coding, so the framing headers
    /// are left out of the rendering.
    #[tracing::instrument(skip(self))]
    async fn get(&self, url: &str) -> Result<String> {
        debug!("GET {}...", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let mut raw = format!("{:?} {}\r\n", response.version(), response.status());
        for (name, value) in response.headers() {
            if name == TRANSFER_ENCODING || name == CONTENT_LENGTH {
                continue;
            }
            raw.push_str(&format!(
                "{}: {}\r\n",
                name,
                String::from_utf8_lossy(value.as_bytes())
            ));
        }
        raw.push_str("\r\n");

        let body = response
            .text()
            .await
            .context("Failed to read response body")?;
        raw.push_str(&body);

        Ok(raw)
    }
}
