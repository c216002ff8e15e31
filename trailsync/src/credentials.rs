//! TestRail credential and connection loading from the environment.

use log::{debug, info};
use testrail_platform::TestRailConfig;

/// Custom error types for credential operations
#[derive(thiserror::Error, Debug)]
pub enum CredentialError {
    #[error("Environment variable validation failed: {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Missing required environment variables: {missing}")]
    MissingCredentials { missing: String },
}

/// Secure wrapper for the TestRail password that redacts the value in debug
/// output.
#[derive(Clone)]
pub struct SecurePassword(String);

impl SecurePassword {
    pub fn new(password: String) -> Self {
        SecurePassword(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SecurePassword {
    fn from(password: String) -> Self {
        SecurePassword(password)
    }
}

impl std::fmt::Debug for SecurePassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

fn required_var(name: &str) -> Result<String, CredentialError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(CredentialError::MissingCredentials {
            missing: name.to_string(),
        }),
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a numeric environment value, reporting the offending variable.
fn numeric_var(name: &str, value: &str) -> Result<u64, CredentialError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| CredentialError::ValidationError {
            field: name.to_string(),
            message: format!("expected a numeric ID, got '{value}'"),
        })
}

/// Load the TestRail connection configuration from environment variables.
///
/// `TESTRAIL_HOST`, `TESTRAIL_USERNAME`, `TESTRAIL_PASSWORD` and
/// `TESTRAIL_PROJECT_ID` are required; `TESTRAIL_SUITE_ID` and
/// `TESTRAIL_RUN_NAME` are optional defaults picked up by the service.
pub fn load_testrail_config() -> Result<TestRailConfig, CredentialError> {
    let host = required_var("TESTRAIL_HOST")?;
    let username = required_var("TESTRAIL_USERNAME")?;
    let password = SecurePassword::new(required_var("TESTRAIL_PASSWORD")?);
    let project_raw = required_var("TESTRAIL_PROJECT_ID")?;
    let project_id = numeric_var("TESTRAIL_PROJECT_ID", &project_raw)?;

    if !host.starts_with("http://") && !host.starts_with("https://") {
        return Err(CredentialError::ValidationError {
            field: "TESTRAIL_HOST".to_string(),
            message: format!("expected an http(s) URL, got '{host}'"),
        });
    }

    let mut config = TestRailConfig::new(host, username, password.into_string(), project_id);

    if let Some(suite_raw) = optional_var("TESTRAIL_SUITE_ID") {
        config = config.with_suite_id(numeric_var("TESTRAIL_SUITE_ID", &suite_raw)?);
    }
    if let Some(run_name) = optional_var("TESTRAIL_RUN_NAME") {
        config = config.with_run_name(run_name);
    }

    info!("TestRail configuration loaded for project {}", config.project_id);
    debug!(
        "TestRail host: {}, default suite: {:?}",
        config.host, config.suite_id
    );

    Ok(config)
}

/// Read a run ID from the `TESTRAIL_RUN_ID` environment variable, if set.
pub fn run_id_from_env() -> Result<Option<u64>, CredentialError> {
    match optional_var("TESTRAIL_RUN_ID") {
        Some(raw) => Ok(Some(numeric_var("TESTRAIL_RUN_ID", &raw)?)),
        None => Ok(None),
    }
}
