//! Run operations of the TestRail API.

use serde::{Deserialize, Serialize};

use crate::client::error_for_status;
use crate::{TestRailClient, TestRailError};

/// Represents a TestRail test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub suite_id: Option<u64>,
    pub project_id: Option<u64>,
    pub is_completed: Option<bool>,
    pub include_all: Option<bool>,
    pub passed_count: Option<u64>,
    pub failed_count: Option<u64>,
    pub blocked_count: Option<u64>,
    pub untested_count: Option<u64>,
    pub url: Option<String>,
}

/// Request payload for creating a new run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite_id: Option<u64>,
    pub include_all: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_ids: Option<Vec<u64>>,
}

/// TestRail run API operations.
pub struct RunsApi<'a> {
    client: &'a TestRailClient,
}

impl<'a> RunsApi<'a> {
    /// Create a new RunsApi instance.
    pub fn new(client: &'a TestRailClient) -> Self {
        Self { client }
    }

    /// Create a new run in a project.
    ///
    /// # Arguments
    ///
    /// * `project_id` - The numeric project ID
    /// * `request` - The run creation request
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn add_run(
        &self,
        project_id: u64,
        request: &CreateRunRequest,
    ) -> Result<Run, TestRailError> {
        let operation = format!("add_run/{project_id}");
        let response = self.client.post(&operation, Some(request)).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("project {project_id}")).await);
        }

        let run: Run = response.json().await?;
        Ok(run)
    }

    /// Get a run by ID.
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NotFound` when the run does not exist, or
    /// another error if the API request fails.
    pub async fn get_run(&self, run_id: u64) -> Result<Run, TestRailError> {
        let operation = format!("get_run/{run_id}");
        let response = self.client.get(&operation, &[]).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("run {run_id}")).await);
        }

        let run: Run = response.json().await?;
        Ok(run)
    }

    /// Close a run, locking its results.
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NotFound` when the run does not exist, or
    /// another error if the API request fails.
    pub async fn close_run(&self, run_id: u64) -> Result<Run, TestRailError> {
        let operation = format!("close_run/{run_id}");
        let response = self.client.post::<()>(&operation, None).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("run {run_id}")).await);
        }

        let run: Run = response.json().await?;
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_run_request_serialization() {
        let request = CreateRunRequest {
            name: "Nightly".to_string(),
            description: None,
            suite_id: Some(2),
            include_all: false,
            case_ids: Some(vec![1, 2, 3]),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["name"], "Nightly");
        assert_eq!(json["suite_id"], 2);
        assert_eq!(json["include_all"], false);
        assert_eq!(json["case_ids"], serde_json::json!([1, 2, 3]));
        // omitted optionals are not serialized at all
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_run_deserialization() {
        let json = r#"{
            "id": 81,
            "name": "Nightly",
            "description": null,
            "suite_id": 2,
            "include_all": true,
            "is_completed": false,
            "passed_count": 12,
            "failed_count": 1
        }"#;
        let run: Run = serde_json::from_str(json).unwrap();
        assert_eq!(run.id, 81);
        assert_eq!(run.include_all, Some(true));
        assert_eq!(run.passed_count, Some(12));
    }
}
