//! Run creation support: the persisted current-run file.
//!
//! The `create-run` command saves the created run to `.testrail/current-run.json`
//! so that a later `report-results` invocation (possibly a different process)
//! can pick it up without an explicit `--run-id`.

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use testrail_platform::run::Run;

use crate::credentials;
use crate::error::{Result, SyncError};

/// Directory the current-run file lives in, relative to the working
/// directory.
pub const RUN_INFO_DIR: &str = ".testrail";

/// File name of the persisted run information.
pub const RUN_INFO_FILE: &str = "current-run.json";

/// Persisted information about the current run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub created_on: String,
}

/// Default location of the persisted run file.
pub fn default_run_info_path() -> PathBuf {
    Path::new(RUN_INFO_DIR).join(RUN_INFO_FILE)
}

/// Persist a created run for later commands, creating the directory as
/// needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_run_info(path: &Path, run: &Run) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let info = RunInfo {
        id: run.id,
        name: run.name.clone(),
        description: run.description.clone(),
        created_on: Utc::now().to_rfc3339(),
    };

    let content = serde_json::to_string_pretty(&info)?;
    std::fs::write(path, content)?;
    info!("TestRail run ID saved to {}", path.display());
    Ok(())
}

/// Load the persisted run information.
///
/// # Errors
///
/// Returns an error if the file is missing or does not parse.
pub fn load_run_info(path: &Path) -> Result<RunInfo> {
    let content = std::fs::read_to_string(path)?;
    let info: RunInfo = serde_json::from_str(&content)?;
    Ok(info)
}

/// Resolve the run ID to report against.
///
/// Precedence: explicit CLI argument, then the `TESTRAIL_RUN_ID`
/// environment variable, then the persisted run file.
///
/// # Errors
///
/// Returns `SyncError::NoRunId` when none of the sources yields an ID.
pub fn resolve_run_id(cli_run_id: Option<u64>, run_file: &Path) -> Result<u64> {
    if let Some(run_id) = cli_run_id {
        return Ok(run_id);
    }

    if let Some(run_id) = credentials::run_id_from_env()? {
        return Ok(run_id);
    }

    if run_file.exists() {
        return Ok(load_run_info(run_file)?.id);
    }

    Err(SyncError::NoRunId(
        "pass --run-id, set TESTRAIL_RUN_ID, or create a run first".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_run() -> Run {
        Run {
            id: 81,
            name: "Nightly".to_string(),
            description: Some("created by tests".to_string()),
            suite_id: Some(2),
            project_id: Some(1),
            is_completed: Some(false),
            include_all: Some(true),
            passed_count: None,
            failed_count: None,
            blocked_count: None,
            untested_count: None,
            url: None,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(RUN_INFO_DIR).join(RUN_INFO_FILE);

        save_run_info(&path, &sample_run()).unwrap();
        let loaded = load_run_info(&path).unwrap();

        assert_eq!(loaded.id, 81);
        assert_eq!(loaded.name, "Nightly");
        assert_eq!(loaded.description.as_deref(), Some("created by tests"));
        assert!(!loaded.created_on.is_empty());
    }

    #[test]
    fn test_resolve_run_id_prefers_cli_argument() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current-run.json");
        save_run_info(&path, &sample_run()).unwrap();

        assert_eq!(resolve_run_id(Some(7), &path).unwrap(), 7);
    }

    #[test]
    fn test_resolve_run_id_falls_back_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("current-run.json");
        save_run_info(&path, &sample_run()).unwrap();

        assert_eq!(resolve_run_id(None, &path).unwrap(), 81);
    }

    #[test]
    fn test_resolve_run_id_errors_without_sources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");

        let err = resolve_run_id(None, &path).unwrap_err();
        assert!(matches!(err, SyncError::NoRunId(_)));
    }
}
