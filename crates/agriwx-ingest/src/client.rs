//! HTTP client for the CWA open data file API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use agriwx_core::ApiConfig;
use reqwest::Client;
use tracing::instrument;

use crate::error::{FetchError, IngestError};
use crate::payload::FeedDocument;

const USER_AGENT: &str = concat!("agriwx/", env!("CARGO_PKG_VERSION"));

/// Fetches the weekly forecast feed. One request per call, no retries.
#[derive(Debug, Clone)]
pub struct CwaClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    fallback_file: Option<PathBuf>,
}

impl CwaClient {
    pub fn new(config: &ApiConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::from_reqwest(&config.endpoint, e))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key(),
            fallback_file: config.fallback_file.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch and decode the feed.
    ///
    /// # Errors
    ///
    /// [`IngestError::Fetch`] when neither the API nor the fallback file yields a body,
    /// [`IngestError::Parse`] when the body is not the expected JSON document.
    pub async fn fetch_payload(&self) -> Result<FeedDocument, IngestError> {
        let body = self.fetch_body().await?;
        Ok(FeedDocument::from_json(&body)?)
    }

    /// Fetch the raw feed body, reading the fallback file if the request fails.
    pub async fn fetch_body(&self) -> Result<String, FetchError> {
        match self.request_body().await {
            Ok(body) => Ok(body),
            Err(err) => match &self.fallback_file {
                Some(path) => self.read_fallback(path, err).await,
                None => Err(err),
            },
        }
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint), level = "info")]
    async fn request_body(&self) -> Result<String, FetchError> {
        let mut request = self.client.get(&self.endpoint);
        match &self.api_key {
            Some(key) => request = request.query(&[("Authorization", key.as_str())]),
            None => tracing::warn!("No authorization key configured; the API will likely reject the request"),
        }

        let response = request
            .query(&[("downloadType", "WEB"), ("format", "JSON")])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Forecast API returned {}", status);
            return Err(FetchError::Status { status, body });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&self.endpoint, e))?;

        tracing::info!("Fetched forecast feed ({} bytes)", body.len());
        Ok(body)
    }

    async fn read_fallback(&self, path: &Path, cause: FetchError) -> Result<String, FetchError> {
        tracing::warn!(
            "Forecast API unavailable ({}), reading fallback file {}",
            cause,
            path.display()
        );

        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::Fallback {
                path: path.to_path_buf(),
                cause: cause.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_config(endpoint: String) -> ApiConfig {
        ApiConfig {
            endpoint,
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            fallback_file: None,
        }
    }

    #[tokio::test]
    async fn test_sends_authorization_and_format() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/F-A0010-001"))
            .and(query_param("Authorization", "test-key"))
            .and(query_param("downloadType", "WEB"))
            .and(query_param("format", "JSON"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&api_config(format!("{}/F-A0010-001", mock_server.uri()))).unwrap();
        let body = client.fetch_body().await.unwrap();

        assert_eq!(body, "{}");
    }

    #[tokio::test]
    async fn test_non_success_status_is_fetch_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CwaClient::new(&api_config(mock_server.uri())).unwrap();
        let result = client.fetch_body().await;

        match result {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fallback_file_used_when_api_fails() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fallback = dir.path().join("F-A0010-001.json");
        std::fs::write(&fallback, r#"{"cwaopendata":{}}"#).unwrap();

        let mut config = api_config(mock_server.uri());
        config.fallback_file = Some(fallback);
        let client = CwaClient::new(&config).unwrap();

        let body = client.fetch_body().await.unwrap();
        assert_eq!(body, r#"{"cwaopendata":{}}"#);
    }

    #[tokio::test]
    async fn test_missing_fallback_file_is_fetch_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = api_config(mock_server.uri());
        config.fallback_file = Some(dir.path().join("absent.json"));
        let client = CwaClient::new(&config).unwrap();

        let result = client.fetch_body().await;
        assert!(matches!(result, Err(FetchError::Fallback { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let client = CwaClient::new(&api_config("http://127.0.0.1:9/feed".to_string())).unwrap();
        let result = client.fetch_body().await;
        assert!(matches!(
            result,
            Err(FetchError::Request { .. }) | Err(FetchError::Timeout { .. })
        ));
    }
}
