//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Create a client using the configured user agent and timeouts
    pub fn from_config(config: &HttpConfig) -> Result<Self, SourceError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(default_user_agent);

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Start a GET request
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send a request and fail on non-success status codes
    pub async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, SourceError> {
        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch {}: {}", what, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::Api(format!("{} returned status: {}", what, status)));
        }

        Ok(response)
    }

    /// Send a request and read the body as text
    pub async fn get_text(&self, request: RequestBuilder, what: &str) -> Result<String, SourceError> {
        self.send(request, what)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read {} response: {}", what, e)))
    }

    /// Send a request and decode the body as JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, SourceError> {
        let body = self.get_text(request, what).await?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("Failed to parse {} JSON: {}", what, e)))
    }
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_from_config() {
        let config = HttpConfig {
            timeout_seconds: 5,
            connect_timeout_seconds: 2,
            user_agent: Some("paper-scout-test/1.0".to_string()),
        };
        assert!(HttpClient::from_config(&config).is_ok());
        assert!(HttpClient::new().is_ok());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;
        let _broken = server
            .mock("GET", "/broken")
            .with_status(503)
            .create_async()
            .await;
        let _json = server
            .mock("GET", "/json")
            .with_status(200)
            .with_body(r#"{"answer": 42}"#)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();

        let missing = client
            .get_text(client.get(&format!("{}/missing", server.url())), "test")
            .await;
        assert!(matches!(missing, Err(SourceError::NotFound(_))));

        let broken = client
            .get_text(client.get(&format!("{}/broken", server.url())), "test")
            .await;
        assert!(matches!(broken, Err(SourceError::Api(_))));

        let value: serde_json::Value = client
            .get_json(client.get(&format!("{}/json", server.url())), "test")
            .await
            .unwrap();
        assert_eq!(value["answer"], 42);
    }
}
