//! Error types for the trailsync application
use crate::credentials::CredentialError;

/// Custom error type for trailsync operations
#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    /// TestRail API error
    #[error("TestRail API error: {0}")]
    TestRailApi(#[from] testrail_platform::TestRailError),

    /// Credential error
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// File I/O error
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Results file missing or unreadable
    #[error("Results file error: {0}")]
    ResultsFile(String),

    /// No TestRail run ID available
    #[error("No TestRail run ID found: {0}")]
    NoRunId(String),

    /// Coverage below the required threshold in strict mode
    #[error("Coverage check failed: {0}")]
    CoverageFailed(String),
}

/// Result type alias for trailsync operations
pub type Result<T> = std::result::Result<T, SyncError>;
