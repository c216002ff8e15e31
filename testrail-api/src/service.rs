//! High-level TestRail service facade.
//!
//! Combines the per-entity API modules behind one stateful interface that
//! owns the client, the current run ID, and the per-entity lookup caches.
//! Suite, section-list and case-list lookups are cached for the lifetime of
//! the service instance; run and result operations are never cached.

use chrono::Utc;
use log::debug;

use crate::cache::EntityCache;
use crate::case::{Case, CasesApi};
use crate::results::{ResultsApi, SubmittedResult, TestResult};
use crate::run::{CreateRunRequest, Run, RunsApi};
use crate::suite::{Section, Suite, SuitesApi};
use crate::{TestRailClient, TestRailConfig, TestRailError};

/// Stateful facade over the TestRail API for a single project.
#[derive(Debug)]
pub struct TestRailService {
    client: TestRailClient,
    run_id: Option<u64>,
    suites: EntityCache<Suite>,
    sections: EntityCache<Vec<Section>>,
    cases: EntityCache<Vec<Case>>,
}

impl TestRailService {
    /// Create a new service instance for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed from the
    /// configuration.
    pub fn new(config: TestRailConfig) -> Result<Self, TestRailError> {
        let client = TestRailClient::new(config)?;
        Ok(Self {
            client,
            run_id: None,
            suites: EntityCache::new(),
            sections: EntityCache::new(),
            cases: EntityCache::new(),
        })
    }

    /// Get access to the underlying client.
    pub fn client(&self) -> &TestRailClient {
        &self.client
    }

    /// The numeric project ID all operations are scoped to.
    pub fn project_id(&self) -> u64 {
        self.client.config().project_id
    }

    /// The configured default suite ID, if any.
    pub fn default_suite_id(&self) -> Option<u64> {
        self.client.config().suite_id
    }

    /// The current run ID, if one has been created or assigned.
    pub fn run_id(&self) -> Option<u64> {
        self.run_id
    }

    /// Assign an existing run as the current run.
    pub fn set_run_id(&mut self, run_id: u64) {
        self.run_id = Some(run_id);
    }

    /// List all suites of the project. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_suites(&self) -> Result<Vec<Suite>, TestRailError> {
        SuitesApi::new(&self.client)
            .get_suites(self.project_id())
            .await
    }

    /// Get a suite by ID, from cache when available.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the suite is not found.
    pub async fn get_suite(&mut self, suite_id: u64) -> Result<Suite, TestRailError> {
        if let Some(suite) = self.suites.get(suite_id) {
            debug!("suite {suite_id} served from cache");
            return Ok(suite.clone());
        }

        let suite = SuitesApi::new(&self.client).get_suite(suite_id).await?;
        self.suites.insert(suite_id, suite.clone());
        Ok(suite)
    }

    /// List the sections of a suite, from cache when available.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_sections(&mut self, suite_id: u64) -> Result<Vec<Section>, TestRailError> {
        if let Some(sections) = self.sections.get(suite_id) {
            debug!("sections of suite {suite_id} served from cache");
            return Ok(sections.clone());
        }

        let sections = SuitesApi::new(&self.client)
            .get_sections(self.project_id(), suite_id)
            .await?;
        self.sections.insert(suite_id, sections.clone());
        Ok(sections)
    }

    /// List the cases of a suite, from cache when available.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn get_cases_by_suite(&mut self, suite_id: u64) -> Result<Vec<Case>, TestRailError> {
        if let Some(cases) = self.cases.get(suite_id) {
            debug!("cases of suite {suite_id} served from cache");
            return Ok(cases.clone());
        }

        let cases = CasesApi::new(&self.client)
            .get_cases(self.project_id(), suite_id)
            .await?;
        self.cases.insert(suite_id, cases.clone());
        Ok(cases)
    }

    /// Get a single case by ID. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the case is not found.
    pub async fn get_case(&self, case_id: u64) -> Result<Case, TestRailError> {
        CasesApi::new(&self.client).get_case(case_id).await
    }

    /// Create a new run and make it the current run.
    ///
    /// The run name falls back to the configured default name, then to a
    /// timestamped generated name. When `case_ids` is omitted the run
    /// includes every case of the configured suite (`include_all`);
    /// otherwise exactly the given cases.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn create_run(
        &mut self,
        name: Option<&str>,
        description: Option<&str>,
        case_ids: Option<Vec<u64>>,
    ) -> Result<Run, TestRailError> {
        let run_name = name
            .map(String::from)
            .or_else(|| self.client.config().run_name.clone())
            .unwrap_or_else(|| format!("Automated Test Run - {}", Utc::now().to_rfc3339()));

        let request = CreateRunRequest {
            name: run_name,
            description: Some(
                description
                    .unwrap_or("Automated test run created by the test framework")
                    .to_string(),
            ),
            suite_id: self.default_suite_id(),
            include_all: case_ids.is_none(),
            case_ids,
        };

        let run = RunsApi::new(&self.client)
            .add_run(self.project_id(), &request)
            .await?;
        self.run_id = Some(run.id);
        Ok(run)
    }

    /// Close a run. Uses the current run when `run_id` is omitted.
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NoRunId` when neither an argument nor a
    /// current run ID is available, or another error if the API request
    /// fails.
    pub async fn close_run(&self, run_id: Option<u64>) -> Result<Run, TestRailError> {
        let id = run_id.or(self.run_id).ok_or(TestRailError::NoRunId)?;
        RunsApi::new(&self.client).close_run(id).await
    }

    /// Submit one result against the current run.
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NoRunId` when no run has been created or
    /// assigned, or another error if the API request fails.
    pub async fn add_result(&self, result: &TestResult) -> Result<SubmittedResult, TestRailError> {
        let run_id = self.run_id.ok_or(TestRailError::NoRunId)?;
        ResultsApi::new(&self.client)
            .add_result_for_case(run_id, result)
            .await
    }

    /// Submit many results against the current run with a single call.
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NoRunId` when no run has been created or
    /// assigned, or another error if the API request fails.
    pub async fn add_results(
        &self,
        results: &[TestResult],
    ) -> Result<Vec<SubmittedResult>, TestRailError> {
        let run_id = self.run_id.ok_or(TestRailError::NoRunId)?;
        ResultsApi::new(&self.client)
            .add_results_for_cases(run_id, results)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::TestStatus;

    fn test_service() -> TestRailService {
        let config = TestRailConfig::new(
            "https://example.testrail.io".to_string(),
            "user@example.com".to_string(),
            "secret".to_string(),
            1,
        )
        .with_suite_id(2);
        TestRailService::new(config).unwrap()
    }

    #[test]
    fn test_run_id_assignment() {
        let mut service = test_service();
        assert_eq!(service.run_id(), None);
        service.set_run_id(81);
        assert_eq!(service.run_id(), Some(81));
    }

    #[test]
    fn test_default_suite_id() {
        let service = test_service();
        assert_eq!(service.default_suite_id(), Some(2));
        assert_eq!(service.project_id(), 1);
    }

    #[tokio::test]
    async fn test_add_results_requires_run_id() {
        let service = test_service();
        let results = vec![TestResult {
            case_id: 1,
            status_id: TestStatus::Passed,
            comment: None,
            elapsed: None,
            defects: None,
            version: None,
        }];

        let err = service.add_results(&results).await.unwrap_err();
        assert!(matches!(err, TestRailError::NoRunId));
    }

    #[tokio::test]
    async fn test_close_run_requires_run_id() {
        let service = test_service();
        let err = service.close_run(None).await.unwrap_err();
        assert!(matches!(err, TestRailError::NoRunId));
    }
}
