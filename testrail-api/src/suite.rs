//! Suite and section operations of the TestRail API.

use serde::{Deserialize, Serialize};

use crate::client::error_for_status;
use crate::{TestRailClient, TestRailError};

/// Page size used for paginated list endpoints.
pub(crate) const PAGE_LIMIT: usize = 250;

/// Represents a TestRail test suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub project_id: Option<u64>,
    pub is_baseline: Option<bool>,
    pub is_completed: Option<bool>,
    pub is_master: Option<bool>,
    pub url: Option<String>,
}

/// Represents a section within a TestRail suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub suite_id: Option<u64>,
    pub parent_id: Option<u64>,
    pub depth: Option<u32>,
    pub display_order: Option<u32>,
}

/// Pagination links of an enveloped list response.
#[derive(Debug, Deserialize)]
pub(crate) struct PageLinks {
    pub next: Option<String>,
}

/// List responses come in two shapes depending on the TestRail version:
/// newer instances wrap the items in a pagination envelope, older ones
/// return a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SectionsResponse {
    Paged {
        sections: Vec<Section>,
        #[serde(rename = "_links")]
        links: Option<PageLinks>,
    },
    Flat(Vec<Section>),
}

impl SectionsResponse {
    /// The page's sections plus whether another page follows.
    fn into_page(self) -> (Vec<Section>, bool) {
        match self {
            SectionsResponse::Paged { sections, links } => {
                let has_next = links.is_some_and(|l| l.next.is_some());
                (sections, has_next)
            }
            // A bare array is the complete result set.
            SectionsResponse::Flat(sections) => (sections, false),
        }
    }
}

/// TestRail suite and section API operations.
pub struct SuitesApi<'a> {
    client: &'a TestRailClient,
}

impl<'a> SuitesApi<'a> {
    /// Create a new SuitesApi instance.
    pub fn new(client: &'a TestRailClient) -> Self {
        Self { client }
    }

    /// List all suites of a project.
    ///
    /// # Arguments
    ///
    /// * `project_id` - The numeric project ID
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the project is not
    /// found.
    pub async fn get_suites(&self, project_id: u64) -> Result<Vec<Suite>, TestRailError> {
        let operation = format!("get_suites/{project_id}");
        let response = self.client.get(&operation, &[]).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("project {project_id}")).await);
        }

        let suites: Vec<Suite> = response.json().await?;
        Ok(suites)
    }

    /// Get a single suite by ID.
    ///
    /// # Arguments
    ///
    /// * `suite_id` - The numeric suite ID
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NotFound` when the suite does not exist, or
    /// another error if the API request fails.
    pub async fn get_suite(&self, suite_id: u64) -> Result<Suite, TestRailError> {
        let operation = format!("get_suite/{suite_id}");
        let response = self.client.get(&operation, &[]).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("suite {suite_id}")).await);
        }

        let suite: Suite = response.json().await?;
        Ok(suite)
    }

    /// List all sections of a suite, following pagination until exhausted.
    ///
    /// # Arguments
    ///
    /// * `project_id` - The numeric project ID
    /// * `suite_id` - The numeric suite ID
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn get_sections(
        &self,
        project_id: u64,
        suite_id: u64,
    ) -> Result<Vec<Section>, TestRailError> {
        let operation = format!("get_sections/{project_id}");
        let mut sections = Vec::new();
        let mut offset = 0usize;

        loop {
            let params = [
                ("suite_id", suite_id.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("offset", offset.to_string()),
            ];
            let response = self.client.get(&operation, &params).await?;

            if !response.status().is_success() {
                return Err(error_for_status(response, &format!("suite {suite_id}")).await);
            }

            let page: SectionsResponse = response.json().await?;
            let (page, has_next) = page.into_page();
            let page_len = page.len();
            sections.extend(page);

            if !has_next || page_len == 0 {
                break;
            }
            offset += page_len;
        }

        Ok(sections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_response_flat_is_complete() {
        let json = r#"[{"id": 1, "name": "Login"}, {"id": 2, "name": "Checkout"}]"#;
        let parsed: SectionsResponse = serde_json::from_str(json).unwrap();
        let (sections, has_next) = parsed.into_page();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "Login");
        assert!(!has_next);
    }

    #[test]
    fn test_sections_response_paged_follows_next_link() {
        let json = r#"{
            "offset": 0,
            "limit": 250,
            "size": 1,
            "_links": {"next": "/api/v2/get_sections/1&suite_id=2&offset=250", "prev": null},
            "sections": [{"id": 3, "name": "Search", "suite_id": 2}]
        }"#;
        let parsed: SectionsResponse = serde_json::from_str(json).unwrap();
        let (sections, has_next) = parsed.into_page();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].suite_id, Some(2));
        assert!(has_next);
    }

    #[test]
    fn test_sections_response_last_page() {
        let json = r#"{
            "offset": 250,
            "limit": 250,
            "size": 3,
            "_links": {"next": null, "prev": "/api/v2/get_sections/1&suite_id=2&offset=0"},
            "sections": []
        }"#;
        let parsed: SectionsResponse = serde_json::from_str(json).unwrap();
        let (_, has_next) = parsed.into_page();
        assert!(!has_next);
    }

    #[test]
    fn test_suite_deserialization() {
        let json = r#"{
            "id": 7,
            "name": "Master",
            "description": null,
            "project_id": 1,
            "is_master": true,
            "url": "https://example.testrail.io/index.php?/suites/view/7"
        }"#;
        let suite: Suite = serde_json::from_str(json).unwrap();
        assert_eq!(suite.id, 7);
        assert_eq!(suite.name, "Master");
        assert_eq!(suite.is_master, Some(true));
    }
}
