use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};

use crate::{
    http::{HttpClient, TokioSleeper},
    registry::{DEFAULT_API_URL, RegistryClient},
    runtime::Runtime,
};

/// Registry client used by the commands.
pub type LiveRegistry = RegistryClient<HttpClient, TokioSleeper>;

pub struct Config<R: Runtime> {
    pub runtime: R,
    pub registry: LiveRegistry,
}

impl<R: Runtime> Config<R> {
    pub fn new(runtime: R, api_url: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(token) = runtime.env_var("GITHUB_TOKEN") {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using GITHUB_TOKEN for authentication: {}", mask(&token));
        }

        let client = Client::builder()
            .user_agent("tinn-cli")
            .default_headers(headers)
            .build()?;

        let api_url = api_url.as_deref().unwrap_or(DEFAULT_API_URL);
        let registry = RegistryClient::new(HttpClient::new(client), TokioSleeper, api_url);

        Ok(Self { runtime, registry })
    }
}

fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::runtime::MockRuntime;
    use mockito::{Matcher, Server};

    /// Helper function to verify Authorization header behavior
    /// - `token`: Some(token) to test with GITHUB_TOKEN set, None to test without
    async fn verify_authorization_header(token: Option<&str>) {
        // --- Setup MockRuntime ---

        let mut runtime = MockRuntime::new();
        let token_clone = token.map(|t| t.to_string());

        runtime
            .expect_env_var()
            .with(mockall::predicate::eq("GITHUB_TOKEN"))
            .returning(move |_| token_clone.clone().ok_or(std::env::VarError::NotPresent));

        // --- Create Mock Server ---

        let mut server = Server::new_async().await;

        let expected_header = match token {
            Some(t) => Matcher::Exact(format!("Bearer {}", t)),
            None => Matcher::Missing,
        };

        let mock = server
            .mock("GET", "/search/repositories")
            .match_query(Matcher::Any)
            .match_header("Authorization", expected_header)
            .match_header("User-Agent", "tinn-cli")
            .with_body(r#"{"total_count": 0, "items": []}"#)
            .create_async()
            .await;

        // --- Execute ---

        let config = Config::new(runtime, Some(server.url())).unwrap();
        let results = config.registry.search("foo").await;

        // --- Verify ---

        mock.assert_async().await;
        assert_eq!(results.map(|r| r.items.len()), Some(0));
    }

    #[tokio::test]
    async fn test_config_new_with_github_token() {
        verify_authorization_header(Some("ghp_0123456789abcdef")).await;
    }

    #[tokio::test]
    async fn test_config_new_without_github_token() {
        verify_authorization_header(None).await;
    }

    #[test]
    fn test_config_default_api_url() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_env_var()
            .returning(|_| Err(std::env::VarError::NotPresent));

        let config = Config::new(runtime, None).unwrap();
        assert_eq!(config.registry.api_url(), "https://api.github.com");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("short"), "*****");
        assert_eq!(mask("ghp_0123456789abcdef"), "ghp_0123*********cdef");
    }
}
