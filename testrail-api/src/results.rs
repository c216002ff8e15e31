//! Result submission operations of the TestRail API.

use serde::{Deserialize, Serialize};

use crate::client::error_for_status;
use crate::{TestRailClient, TestRailError};

/// TestRail test status wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TestStatus {
    Passed,
    Blocked,
    Untested,
    Retest,
    Failed,
    InProgress,
    Skipped,
}

impl From<TestStatus> for u8 {
    fn from(status: TestStatus) -> Self {
        match status {
            TestStatus::Passed => 1,
            TestStatus::Blocked => 2,
            TestStatus::Untested => 3,
            TestStatus::Retest => 4,
            TestStatus::Failed => 5,
            TestStatus::InProgress => 6,
            TestStatus::Skipped => 7,
        }
    }
}

impl TryFrom<u8> for TestStatus {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(TestStatus::Passed),
            2 => Ok(TestStatus::Blocked),
            3 => Ok(TestStatus::Untested),
            4 => Ok(TestStatus::Retest),
            5 => Ok(TestStatus::Failed),
            6 => Ok(TestStatus::InProgress),
            7 => Ok(TestStatus::Skipped),
            other => Err(format!("unknown TestRail status code: {other}")),
        }
    }
}

/// A single test result to submit against a case in a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub case_id: u64,
    pub status_id: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Formatted duration string, e.g. `"30s"` or `"2m 30s"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defects: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Request payload for bulk result submission.
#[derive(Debug, Clone, Serialize)]
pub struct AddResultsRequest<'a> {
    pub results: &'a [TestResult],
}

/// A submitted result as returned by TestRail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedResult {
    pub id: u64,
    pub test_id: Option<u64>,
    pub status_id: Option<u8>,
    pub comment: Option<String>,
    pub elapsed: Option<String>,
    pub defects: Option<String>,
    pub version: Option<String>,
}

/// TestRail result API operations.
pub struct ResultsApi<'a> {
    client: &'a TestRailClient,
}

impl<'a> ResultsApi<'a> {
    /// Create a new ResultsApi instance.
    pub fn new(client: &'a TestRailClient) -> Self {
        Self { client }
    }

    /// Submit one result for a case in a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn add_result_for_case(
        &self,
        run_id: u64,
        result: &TestResult,
    ) -> Result<SubmittedResult, TestRailError> {
        let operation = format!("add_result_for_case/{run_id}/{}", result.case_id);
        let response = self.client.post(&operation, Some(result)).await?;

        if !response.status().is_success() {
            return Err(error_for_status(
                response,
                &format!("run {run_id} case {}", result.case_id),
            )
            .await);
        }

        let submitted: SubmittedResult = response.json().await?;
        Ok(submitted)
    }

    /// Submit many results for cases in a run with a single call.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn add_results_for_cases(
        &self,
        run_id: u64,
        results: &[TestResult],
    ) -> Result<Vec<SubmittedResult>, TestRailError> {
        let operation = format!("add_results_for_cases/{run_id}");
        let request = AddResultsRequest { results };
        let response = self.client.post(&operation, Some(&request)).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("run {run_id}")).await);
        }

        let submitted: Vec<SubmittedResult> = response.json().await?;
        Ok(submitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_codes() {
        assert_eq!(u8::from(TestStatus::Passed), 1);
        assert_eq!(u8::from(TestStatus::Blocked), 2);
        assert_eq!(u8::from(TestStatus::Untested), 3);
        assert_eq!(u8::from(TestStatus::Retest), 4);
        assert_eq!(u8::from(TestStatus::Failed), 5);
        assert_eq!(u8::from(TestStatus::InProgress), 6);
        assert_eq!(u8::from(TestStatus::Skipped), 7);
    }

    #[test]
    fn test_status_serializes_as_number() {
        let result = TestResult {
            case_id: 12345,
            status_id: TestStatus::Failed,
            comment: Some("boom".to_string()),
            elapsed: Some("3s".to_string()),
            defects: None,
            version: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status_id"], 5);
        assert_eq!(json["case_id"], 12345);
        assert_eq!(json["elapsed"], "3s");
        assert!(json.get("defects").is_none());
    }

    #[test]
    fn test_status_roundtrip() {
        let status: TestStatus = serde_json::from_str("7").unwrap();
        assert_eq!(status, TestStatus::Skipped);
        assert!(serde_json::from_str::<TestStatus>("9").is_err());
    }

    #[test]
    fn test_bulk_request_shape() {
        let results = vec![TestResult {
            case_id: 1,
            status_id: TestStatus::Passed,
            comment: None,
            elapsed: None,
            defects: None,
            version: None,
        }];
        let json = serde_json::to_value(AddResultsRequest { results: &results }).unwrap();
        assert!(json["results"].is_array());
        assert_eq!(json["results"][0]["case_id"], 1);
    }
}
