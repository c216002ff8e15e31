//! Core TestRail API client implementation.
//!
//! This module contains the foundational client for making authenticated
//! requests to the TestRail REST API, including basic authentication and
//! HTTP request handling.

use reqwest::Client;
use serde::Serialize;

use crate::{TestRailConfig, TestRailError};

/// Core TestRail API client.
///
/// This struct provides the foundational HTTP client with basic
/// authentication for making requests to any TestRail API endpoint.
///
/// TestRail exposes its API under a single dispatcher path; every operation
/// is addressed as `index.php?/api/v2/<operation>` and additional parameters
/// are appended as `&key=value` pairs rather than a conventional query
/// string.
#[derive(Debug, Clone)]
pub struct TestRailClient {
    config: TestRailConfig,
    client: Client,
}

impl TestRailClient {
    /// Create a new TestRail API client.
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration containing the host, credentials and
    ///   project settings
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the underlying
    /// HTTP client cannot be constructed.
    pub fn new(config: TestRailConfig) -> Result<Self, TestRailError> {
        if config.host.is_empty() {
            return Err(TestRailError::InvalidConfig(
                "TestRail host must not be empty".to_string(),
            ));
        }
        if !config.host.starts_with("http://") && !config.host.starts_with("https://") {
            return Err(TestRailError::InvalidConfig(format!(
                "TestRail host must be an http(s) URL: {}",
                config.host
            )));
        }

        let client = Client::builder().build().map_err(TestRailError::Http)?;
        Ok(Self { config, client })
    }

    /// Get access to the configuration.
    pub fn config(&self) -> &TestRailConfig {
        &self.config
    }

    /// Get the numeric project ID all operations are scoped to.
    pub fn project_id(&self) -> u64 {
        self.config.project_id
    }

    /// Build the dispatcher URL for an API operation.
    ///
    /// TestRail does not use a conventional query string: the operation path
    /// lives inside the `?/api/v2/` dispatcher parameter and every further
    /// parameter is appended with `&`. Parameter values are percent-encoded.
    fn build_url(&self, operation: &str, params: &[(&str, String)]) -> String {
        let mut url = String::with_capacity(
            self.config
                .host
                .len()
                .saturating_add(operation.len())
                .saturating_add(params.len().saturating_mul(24))
                .saturating_add(16),
        );
        url.push_str(&self.config.host);
        url.push_str("/index.php?/api/v2/");
        url.push_str(operation);

        for (key, value) in params {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }

        url
    }

    /// Perform a GET request against an API operation.
    ///
    /// # Arguments
    ///
    /// * `operation` - Operation path, e.g. `get_suites/1`
    /// * `params` - Additional `&key=value` parameters
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent. HTTP error statuses
    /// are returned as part of the response for the caller to interpret.
    pub async fn get(
        &self,
        operation: &str,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, TestRailError> {
        let url = self.build_url(operation, params);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        Ok(response)
    }

    /// Perform a POST request against an API operation with a JSON body.
    ///
    /// # Arguments
    ///
    /// * `operation` - Operation path, e.g. `add_run/1`
    /// * `body` - Optional JSON-serializable request payload
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent. HTTP error statuses
    /// are returned as part of the response for the caller to interpret.
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        operation: &str,
        body: Option<&T>,
    ) -> Result<reqwest::Response, TestRailError> {
        let url = self.build_url(operation, &[]);

        let mut request = self
            .client
            .post(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;

        Ok(response)
    }
}

/// Turn a non-success response into a `TestRailError`.
///
/// Shared by all API modules: 404 maps to `NotFound` with the operation
/// context, everything else to `InvalidResponse` carrying the status and the
/// response body.
pub(crate) async fn error_for_status(
    response: reqwest::Response,
    context: &str,
) -> TestRailError {
    let status = response.status().as_u16();
    if status == 404 {
        return TestRailError::NotFound(context.to_string());
    }
    let error_text = response.text().await.unwrap_or_default();
    TestRailError::InvalidResponse(format!("HTTP {status}: {error_text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TestRailConfig {
        TestRailConfig::new(
            "https://example.testrail.io".to_string(),
            "user@example.com".to_string(),
            "secret".to_string(),
            1,
        )
    }

    #[test]
    fn test_build_url_without_params() {
        let client = TestRailClient::new(test_config()).unwrap();
        assert_eq!(
            client.build_url("get_suites/1", &[]),
            "https://example.testrail.io/index.php?/api/v2/get_suites/1"
        );
    }

    #[test]
    fn test_build_url_with_params() {
        let client = TestRailClient::new(test_config()).unwrap();
        let url = client.build_url(
            "get_cases/1",
            &[("suite_id", "2".to_string()), ("limit", "250".to_string())],
        );
        assert_eq!(
            url,
            "https://example.testrail.io/index.php?/api/v2/get_cases/1&suite_id=2&limit=250"
        );
    }

    #[test]
    fn test_build_url_encodes_values() {
        let client = TestRailClient::new(test_config()).unwrap();
        let url = client.build_url("get_cases/1", &[("filter", "a b&c".to_string())]);
        assert!(url.ends_with("&filter=a%20b%26c"));
    }

    #[test]
    fn test_rejects_non_http_host() {
        let config = TestRailConfig::new(
            "example.testrail.io".to_string(),
            "user".to_string(),
            "secret".to_string(),
            1,
        );
        assert!(TestRailClient::new(config).is_err());
    }
}
