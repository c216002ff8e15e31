//! # TestRail API Client Library
//!
//! A Rust client library for interacting with the TestRail REST API, covering
//! the suite, section, case, run and result endpoints of a project.
//!
//! This library provides a safe and ergonomic interface to a TestRail
//! instance, handling basic authentication, request/response serialization,
//! and error handling.
//!
//! ## Features
//!
//! - 🔐 **Basic Authentication** - Username/password (or API key) credentials
//! - 📚 **Suites & Sections** - Browse the test organization hierarchy
//! - 📋 **Cases** - Typed case records including custom fields and steps
//! - 🏃 **Runs & Results** - Create runs, submit results, close runs
//! - 🗂️ **Cached Facade** - [`TestRailService`] caches suite/section/case
//!   lookups for the lifetime of the service instance
//! - 🚀 **Async/Await** - Built on tokio
//! - ⚡ **Type-Safe** - Full Rust type safety with serde serialization
//!
//! ## Quick Start
//!
//! ```no_run
//! use testrail_platform::{TestRailConfig, TestRailService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TestRailConfig::new(
//!         "https://example.testrail.io".to_string(),
//!         "user@example.com".to_string(),
//!         "api_key".to_string(),
//!         1, // project id
//!     );
//!
//!     let mut service = TestRailService::new(config)?;
//!
//!     let suites = service.get_suites().await?;
//!     for suite in &suites {
//!         let cases = service.get_cases_by_suite(suite.id).await?;
//!         println!("{}: {} cases", suite.name, cases.len());
//!     }
//!
//!     let run = service.create_run(Some("Nightly"), None, None).await?;
//!     println!("created run {}", run.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Caching
//!
//! Suite, section-list and case-list lookups made through [`TestRailService`]
//! are cached by numeric ID for the lifetime of the service instance. Cache
//! entries are immutable snapshots as of fetch time; there is no invalidation
//! policy. Run and result operations are never cached.

pub mod cache;
pub mod case;
pub mod client;
pub mod results;
pub mod run;
pub mod service;
pub mod suite;

use reqwest::Error as ReqwestError;
use std::fmt;

// Re-export common types for convenience
pub use cache::EntityCache;
pub use case::{Case, CaseStep, CasesApi, parse_steps, priority_name, type_name};
pub use client::TestRailClient;
pub use results::{AddResultsRequest, ResultsApi, SubmittedResult, TestResult, TestStatus};
pub use run::{CreateRunRequest, Run, RunsApi};
pub use service::TestRailService;
pub use suite::{Section, Suite, SuitesApi};

/// Custom error type for TestRail API operations.
///
/// This enum represents all possible errors that can occur when interacting
/// with the TestRail REST API.
#[derive(Debug)]
pub enum TestRailError {
    /// HTTP request failed
    Http(ReqwestError),
    /// JSON serialization/deserialization failed
    Serialization(serde_json::Error),
    /// API returned an error response
    InvalidResponse(String),
    /// Configuration is invalid
    InvalidConfig(String),
    /// When an item is not found
    NotFound(String),
    /// A run/result operation was attempted without a current run ID
    NoRunId,
}

impl fmt::Display for TestRailError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TestRailError::Http(e) => write!(f, "HTTP error: {e}"),
            TestRailError::Serialization(e) => write!(f, "Serialization error: {e}"),
            TestRailError::InvalidResponse(e) => write!(f, "Invalid response: {e}"),
            TestRailError::InvalidConfig(e) => write!(f, "Invalid configuration: {e}"),
            TestRailError::NotFound(e) => write!(f, "Item not found: {e}"),
            TestRailError::NoRunId => {
                write!(f, "No test run ID set. Create or set a run first.")
            }
        }
    }
}

impl std::error::Error for TestRailError {}

impl From<ReqwestError> for TestRailError {
    fn from(error: ReqwestError) -> Self {
        TestRailError::Http(error)
    }
}

impl From<serde_json::Error> for TestRailError {
    fn from(error: serde_json::Error) -> Self {
        TestRailError::Serialization(error)
    }
}

/// Configuration for the TestRail API client.
///
/// This struct contains everything needed to connect to a TestRail instance:
/// the host URL, the account credentials, the project the client operates on,
/// and the optional default suite and run name used by higher-level
/// operations.
#[derive(Debug, Clone)]
pub struct TestRailConfig {
    /// Base URL of the TestRail instance (e.g. `https://example.testrail.io`)
    pub host: String,
    /// TestRail account username (usually an email address)
    pub username: String,
    /// TestRail account password or API key (should be kept secret)
    pub password: String,
    /// Numeric ID of the project all operations are scoped to
    pub project_id: u64,
    /// Optional default suite ID used when an operation does not name one
    pub suite_id: Option<u64>,
    /// Optional default name for created runs
    pub run_name: Option<String>,
}

impl TestRailConfig {
    /// Create a new configuration for a TestRail project.
    ///
    /// # Arguments
    ///
    /// * `host` - Base URL of the TestRail instance
    /// * `username` - TestRail account username
    /// * `password` - TestRail account password or API key
    /// * `project_id` - Numeric project ID
    pub fn new(host: String, username: String, password: String, project_id: u64) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            username,
            password,
            project_id,
            suite_id: None,
            run_name: None,
        }
    }

    /// Set the default suite ID for this configuration.
    ///
    /// # Returns
    ///
    /// The updated configuration instance (for method chaining).
    pub fn with_suite_id(mut self, suite_id: u64) -> Self {
        self.suite_id = Some(suite_id);
        self
    }

    /// Set the default run name for this configuration.
    ///
    /// # Returns
    ///
    /// The updated configuration instance (for method chaining).
    pub fn with_run_name(mut self, run_name: String) -> Self {
        self.run_name = Some(run_name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestRailConfig::new(
            "https://example.testrail.io".to_string(),
            "user@example.com".to_string(),
            "secret".to_string(),
            42,
        );

        assert_eq!(config.host, "https://example.testrail.io");
        assert_eq!(config.username, "user@example.com");
        assert_eq!(config.password, "secret");
        assert_eq!(config.project_id, 42);
        assert!(config.suite_id.is_none());
        assert!(config.run_name.is_none());
    }

    #[test]
    fn test_config_strips_trailing_slash() {
        let config = TestRailConfig::new(
            "https://example.testrail.io/".to_string(),
            "user".to_string(),
            "secret".to_string(),
            1,
        );

        assert_eq!(config.host, "https://example.testrail.io");
    }

    #[test]
    fn test_config_builders() {
        let config = TestRailConfig::new(
            "https://example.testrail.io".to_string(),
            "user".to_string(),
            "secret".to_string(),
            1,
        )
        .with_suite_id(7)
        .with_run_name("Nightly".to_string());

        assert_eq!(config.suite_id, Some(7));
        assert_eq!(config.run_name.as_deref(), Some("Nightly"));
    }

    #[test]
    fn test_error_display() {
        let error = TestRailError::InvalidResponse("HTTP 401: unauthorized".to_string());
        assert_eq!(format!("{error}"), "Invalid response: HTTP 401: unauthorized");

        let error = TestRailError::NoRunId;
        assert_eq!(
            format!("{error}"),
            "No test run ID set. Create or set a run first."
        );
    }
}
