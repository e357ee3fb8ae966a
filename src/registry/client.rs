//! Registry client speaking the GitHub repository search API.

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::http::{
    MAX_ATTEMPTS, Sleeper, Transport, backoff_delay, decode_body, rate_limit_message,
};
use crate::ui;

use super::{PackageDescriptor, Registry, SearchResults};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Tag listing entry (internal).
#[derive(Deserialize, Debug)]
struct TagEntry {
    name: String,
}

/// Registry client over a raw HTTP transport.
pub struct RegistryClient<T: Transport, S: Sleeper> {
    transport: T,
    sleeper: S,
    api_url: String,
}

impl<T: Transport, S: Sleeper> RegistryClient<T, S> {
    pub fn new(transport: T, sleeper: S, api_url: &str) -> Self {
        Self {
            transport,
            sleeper,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn search_url(&self, query: &str) -> Option<String> {
        let base = format!("{}/search/repositories", self.api_url);
        match Url::parse_with_params(&base, &[("q", query)]) {
            Ok(url) => Some(url.into()),
            Err(e) => {
                error!("Invalid registry URL {}: {}", base, e);
                None
            }
        }
    }

    /// GET `url` and parse its JSON body, retrying rate-limit answers,
    /// transport failures and unreadable bodies.
    #[tracing::instrument(skip(self))]
    async fn request_json(&self, url: &str) -> Option<Value> {
        debug!("registry request {}", url);

        for attempt in 0..MAX_ATTEMPTS {
            match self.attempt(url).await {
                Attempt::Done(value) => return Some(value),
                Attempt::RateLimited(message) => ui::warn(message),
                Attempt::Unusable => {}
            }

            if attempt + 1 < MAX_ATTEMPTS {
                let delay = backoff_delay(attempt);
                ui::warn(format!("retrying in {}ms...", delay.as_millis()));
                self.sleeper.sleep(delay).await;
            }
        }

        warn!("{}: no usable answer after {} attempts", url, MAX_ATTEMPTS);
        None
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let raw = match self.transport.get(url).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!("transport failure: {:#}", e);
                ui::warn("error sending request to repository");
                return Attempt::Unusable;
            }
        };

        let value = decode_body(&raw)
            .and_then(|body| serde_json::from_str::<Value>(&body).map_err(Into::into));
        match value {
            Ok(value) => match rate_limit_message(&value) {
                Some(message) => Attempt::RateLimited(message.to_string()),
                None => Attempt::Done(value),
            },
            Err(e) => {
                debug!("unreadable reply: {:#}", e);
                ui::warn("invalid reply from repository");
                Attempt::Unusable
            }
        }
    }
}

enum Attempt {
    Done(Value),
    RateLimited(String),
    Unusable,
}

#[async_trait]
impl<T: Transport, S: Sleeper> Registry for RegistryClient<T, S> {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str) -> Option<SearchResults> {
        let url = self.search_url(query)?;
        let value = self.request_json(&url).await?;

        if value.get("items").is_none() {
            println!(
                "error response from repository: {}",
                serde_json::to_string_pretty(&value).unwrap_or_default()
            );
            return None;
        }

        match serde_json::from_value::<SearchResults>(value) {
            Ok(results) => Some(results),
            Err(e) => {
                ui::warn(format!("invalid search results from repository: {}", e));
                None
            }
        }
    }

    #[tracing::instrument(skip(self, descriptor), fields(package = %descriptor.name))]
    async fn list_tags(&self, descriptor: &PackageDescriptor) -> Option<Vec<String>> {
        let value = self.request_json(&descriptor.tags_url).await?;

        match serde_json::from_value::<Vec<TagEntry>>(value) {
            Ok(tags) => {
                let names: Vec<String> = tags.into_iter().map(|t| t.name).collect();
                debug!("got tags for {}: {}", descriptor.name, names.join(" "));
                Some(names)
            }
            Err(e) => {
                ui::warn(format!("invalid tag list for {}: {}", descriptor.name, e));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpClient, MockSleeper, MockTransport};
    use crate::registry::fixtures::descriptor;
    use mockall::predicate::eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ok(body: &str) -> String {
        format!("HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\r\n{}", body)
    }

    const RATE_LIMITED: &str =
        "HTTP/1.1 403 Forbidden\r\n\r\n{\"message\":\"API rate limit exceeded for 10.0.0.1.\"}";

    const FOO_RESULTS: &str = r#"{"total_count": 1, "items": [
        {"id": 7, "name": "foo", "git_url": "https://x/foo.git",
         "tags_url": "https://api/repos/o/foo/tags", "description": "foo lib"}]}"#;

    #[tokio::test]
    async fn test_search_success_first_attempt() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .with(eq("https://api.github.com/search/repositories?q=foo"))
            .times(1)
            .returning(|_| Ok(ok(FOO_RESULTS)));

        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let client = RegistryClient::new(transport, sleeper, DEFAULT_API_URL);
        let results = client.search("foo").await.unwrap();

        assert_eq!(results.total_count, 1);
        assert_eq!(results.items[0].name, "foo");
        assert_eq!(results.items[0].clone_url(), "https://x/foo.git");
    }

    #[tokio::test]
    async fn test_search_encodes_query_terms() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .with(eq("https://registry.local/search/repositories?q=tinn+web"))
            .times(1)
            .returning(|_| Ok(ok(r#"{"total_count":0,"items":[]}"#)));

        let client = RegistryClient::new(transport, MockSleeper::new(), "https://registry.local/");
        assert!(client.search("tinn web").await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_twice_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let mut transport = MockTransport::new();
        transport.expect_get().times(3).returning(move |_| {
            if calls_clone.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(RATE_LIMITED.to_string())
            } else {
                Ok(ok(FOO_RESULTS))
            }
        });

        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .with(eq(Duration::from_millis(200)))
            .times(2)
            .returning(|_| ());

        let client = RegistryClient::new(transport, sleeper, DEFAULT_API_URL);
        let results = client.search("foo").await.unwrap();

        assert_eq!(results.items.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_none() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(MAX_ATTEMPTS)
            .returning(|_| Ok(RATE_LIMITED.to_string()));

        let slept = Arc::new(std::sync::Mutex::new(Vec::new()));
        let slept_clone = Arc::clone(&slept);
        let mut sleeper = MockSleeper::new();
        sleeper
            .expect_sleep()
            .returning(move |d| slept_clone.lock().unwrap().push(d.as_millis()));

        let client = RegistryClient::new(transport, sleeper, DEFAULT_API_URL);
        assert!(client.search("foo").await.is_none());

        // No pause after the final attempt
        assert_eq!(
            *slept.lock().unwrap(),
            vec![200, 200, 200, 1000, 1000, 2500, 2500, 5000, 5000]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_and_garbage_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        let mut transport = MockTransport::new();
        transport.expect_get().times(3).returning(move |_| {
            match calls_clone.fetch_add(1, Ordering::SeqCst) {
                0 => Err(anyhow::anyhow!("connection reset")),
                1 => Ok(ok("<html>busy</html>")),
                _ => Ok(ok(FOO_RESULTS)),
            }
        });

        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().times(2).returning(|_| ());

        let client = RegistryClient::new(transport, sleeper, DEFAULT_API_URL);
        assert!(client.search("foo").await.is_some());
    }

    #[tokio::test]
    async fn test_error_response_is_not_retried() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .times(1)
            .returning(|_| Ok(ok(r#"{"message": "Validation Failed"}"#)));

        let mut sleeper = MockSleeper::new();
        sleeper.expect_sleep().never();

        let client = RegistryClient::new(transport, sleeper, DEFAULT_API_URL);
        assert!(client.search("").await.is_none());
    }

    #[tokio::test]
    async fn test_list_tags_keeps_order() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .with(eq("https://api/repos/someone/bar/tags"))
            .times(1)
            .returning(|_| {
                Ok(ok(r#"[{"name": "1.9.0"}, {"name": "2.1.0"}, {"name": "2.5.0"}]"#))
            });

        let client = RegistryClient::new(transport, MockSleeper::new(), DEFAULT_API_URL);
        let tags = client.list_tags(&descriptor("bar", 2)).await.unwrap();
        assert_eq!(tags, vec!["1.9.0", "2.1.0", "2.5.0"]);
    }

    #[tokio::test]
    async fn test_list_tags_wrong_shape_is_none() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_| Ok(ok(r#"{"message": "Not Found"}"#)));

        let client = RegistryClient::new(transport, MockSleeper::new(), DEFAULT_API_URL);
        assert!(client.list_tags(&descriptor("bar", 2)).await.is_none());
    }

    #[tokio::test]
    async fn test_search_over_http() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/search/repositories")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "foo".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(FOO_RESULTS)
            .create_async()
            .await;

        let transport = HttpClient::new(reqwest::Client::new());
        let client = RegistryClient::new(transport, MockSleeper::new(), &server.url());
        let results = client.search("foo").await.unwrap();
        assert_eq!(results.items[0].id, 7);
    }
}
