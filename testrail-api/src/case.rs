//! Case operations of the TestRail API.
//!
//! TestRail cases carry a fixed core schema plus instance-specific
//! `custom_*` fields. The well-known custom fields (description,
//! preconditions, expected result, steps, tags) are surfaced as typed
//! members; everything else lands in the `extra` map and can be retrieved
//! through [`Case::custom_fields`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::error_for_status;
use crate::suite::PAGE_LIMIT;
use crate::{TestRailClient, TestRailError};

/// A single test step with its expected result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStep {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub expected: String,
}

/// Represents a TestRail test case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: u64,
    pub title: String,
    pub section_id: u64,
    pub suite_id: Option<u64>,
    pub priority_id: Option<u64>,
    pub type_id: Option<u64>,
    pub refs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_preconds: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_steps: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_steps_separated: Option<Vec<CaseStep>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_tags: Option<String>,
    /// Remaining fields, including any further `custom_*` values.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Case {
    /// Resolve the steps of this case.
    ///
    /// Structured steps (`custom_steps_separated`) win; otherwise the flat
    /// `custom_steps` text is parsed with [`parse_steps`].
    pub fn steps(&self) -> Option<Vec<CaseStep>> {
        if let Some(steps) = &self.custom_steps_separated {
            return Some(steps.clone());
        }
        self.custom_steps.as_deref().map(parse_steps)
    }

    /// Extract the custom fields of this case that are not already surfaced
    /// as description/preconditions/expected/steps, with the `custom_`
    /// prefix stripped. The `custom_tags` value is kept here as well as
    /// feeding [`Case::derived_tags`].
    pub fn custom_fields(&self) -> BTreeMap<String, serde_json::Value> {
        let mut result = BTreeMap::new();
        if let Some(tags) = &self.custom_tags {
            result.insert(
                "tags".to_string(),
                serde_json::Value::String(tags.clone()),
            );
        }
        for (key, value) in &self.extra {
            if let Some(name) = key.strip_prefix("custom_") {
                result.insert(name.to_string(), value.clone());
            }
        }
        result
    }

    /// Synthesize scenario tags from this case.
    ///
    /// Produces the case-ID tag, the suite-ID tag, any tags listed in the
    /// `custom_tags` field, priority and type tags, and one `@jira:` tag per
    /// comma-separated reference that has an issue-key shape.
    pub fn derived_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();

        tags.push(format!("@testrail:C{}", self.id));

        if let Some(suite_id) = self.suite_id {
            tags.push(format!("@testsuite:{suite_id}"));
        }

        if let Some(custom_tags) = &self.custom_tags {
            tags.extend(
                custom_tags
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(String::from),
            );
        }

        if let Some(priority_id) = self.priority_id
            && let Some(name) = priority_tag_name(priority_id)
        {
            tags.push(format!("@priority:{name}"));
        }

        if let Some(type_id) = self.type_id
            && let Some(name) = type_name(type_id)
        {
            tags.push(format!("@type:{name}"));
        }

        if let Some(refs) = &self.refs {
            for reference in refs.split(',').map(str::trim) {
                if is_issue_key(reference) {
                    tags.push(format!("@jira:{reference}"));
                }
            }
        }

        tags
    }
}

/// Whether a reference has the `ABC-123` issue-key shape.
fn is_issue_key(reference: &str) -> bool {
    let Some((prefix, digits)) = reference.split_once('-') else {
        return false;
    };
    !prefix.is_empty()
        && prefix.chars().all(|c| c.is_ascii_uppercase())
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

/// Parse steps from the flat `custom_steps` text field.
///
/// Assumes steps come in pairs of lines: step content followed by its
/// expected result. A missing trailing expected line yields an empty string.
pub fn parse_steps(steps_string: &str) -> Vec<CaseStep> {
    let lines: Vec<&str> = steps_string.split('\n').collect();
    let mut steps = Vec::with_capacity(lines.len() / 2 + 1);

    let mut i = 0;
    while i < lines.len() {
        steps.push(CaseStep {
            content: lines[i].to_string(),
            expected: lines.get(i + 1).map(|s| (*s).to_string()).unwrap_or_default(),
        });
        i += 2;
    }

    steps
}

/// Human-readable priority name for a TestRail priority ID.
pub fn priority_name(priority_id: Option<u64>) -> &'static str {
    match priority_id {
        Some(1) => "Low",
        Some(2) => "Medium",
        Some(3) => "High",
        Some(4) => "Critical",
        _ => "Unknown",
    }
}

/// Lowercase priority name used in synthesized `@priority:` tags.
fn priority_tag_name(priority_id: u64) -> Option<&'static str> {
    match priority_id {
        1 => Some("low"),
        2 => Some("medium"),
        3 => Some("high"),
        4 => Some("critical"),
        _ => None,
    }
}

/// Case type name for a TestRail type ID, as used in `@type:` tags.
pub fn type_name(type_id: u64) -> Option<&'static str> {
    match type_id {
        1 => Some("acceptance"),
        2 => Some("accessibility"),
        3 => Some("automated"),
        4 => Some("compatibility"),
        5 => Some("destructive"),
        6 => Some("functional"),
        7 => Some("performance"),
        8 => Some("regression"),
        9 => Some("security"),
        10 => Some("smoke"),
        11 => Some("usability"),
        _ => None,
    }
}

/// List responses come in two shapes depending on the TestRail version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CasesResponse {
    Paged {
        cases: Vec<Case>,
        #[serde(rename = "_links")]
        links: Option<crate::suite::PageLinks>,
    },
    Flat(Vec<Case>),
}

impl CasesResponse {
    /// The page's cases plus whether another page follows.
    fn into_page(self) -> (Vec<Case>, bool) {
        match self {
            CasesResponse::Paged { cases, links } => {
                let has_next = links.is_some_and(|l| l.next.is_some());
                (cases, has_next)
            }
            // A bare array is the complete result set.
            CasesResponse::Flat(cases) => (cases, false),
        }
    }
}

/// TestRail case API operations.
pub struct CasesApi<'a> {
    client: &'a TestRailClient,
}

impl<'a> CasesApi<'a> {
    /// Create a new CasesApi instance.
    pub fn new(client: &'a TestRailClient) -> Self {
        Self { client }
    }

    /// List all cases of a suite, following pagination until exhausted.
    ///
    /// # Arguments
    ///
    /// * `project_id` - The numeric project ID
    /// * `suite_id` - The numeric suite ID
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    pub async fn get_cases(
        &self,
        project_id: u64,
        suite_id: u64,
    ) -> Result<Vec<Case>, TestRailError> {
        let operation = format!("get_cases/{project_id}");
        let mut cases = Vec::new();
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

            let page: CasesResponse = response.json().await?;
            let (page, has_next) = page.into_page();
            let page_len = page.len();
            cases.extend(page);

            if !has_next || page_len == 0 {
                break;
            }
            offset += page_len;
        }

        Ok(cases)
    }

    /// Get a single case by ID.
    ///
    /// # Errors
    ///
    /// Returns `TestRailError::NotFound` when the case does not exist, or
    /// another error if the API request fails.
    pub async fn get_case(&self, case_id: u64) -> Result<Case, TestRailError> {
        let operation = format!("get_case/{case_id}");
        let response = self.client.get(&operation, &[]).await?;

        if !response.status().is_success() {
            return Err(error_for_status(response, &format!("case {case_id}")).await);
        }

        let case: Case = response.json().await?;
        Ok(case)
    }
}
