//! Test case export pipeline.
//!
//! Resolves TestRail cases from scenario tags or whole suites, denormalizes
//! them (suite/section names, steps, custom fields, synthesized tags) and
//! renders them through one of the interchangeable formatters.

use log::{error, info, warn};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use testrail_platform::case::{Case, CaseStep};
use testrail_platform::suite::Suite;
use testrail_platform::TestRailService;

use crate::error::{Result, SyncError};
use crate::formatters::{
    CsvFormatter, HtmlFormatter, JsonFormatter, MarkdownFormatter, TestCaseFormatter,
};
use crate::tags::{extract_case_ids_from_tags, extract_suite_ids_from_tags};

/// Available export formats for test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
    Html,
}

impl ExportFormat {
    /// Resolve a format from a CLI/config string. Unknown values fall back
    /// to Markdown with a warning, matching the historical behavior.
    pub fn from_arg(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "json" => ExportFormat::Json,
            "csv" => ExportFormat::Csv,
            "markdown" | "md" => ExportFormat::Markdown,
            "html" => ExportFormat::Html,
            other => {
                warn!("Unknown export format: {other}, using markdown");
                ExportFormat::Markdown
            }
        }
    }

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }

    fn formatter(&self) -> Box<dyn TestCaseFormatter> {
        match self {
            ExportFormat::Json => Box::new(JsonFormatter),
            ExportFormat::Csv => Box::new(CsvFormatter),
            ExportFormat::Markdown => Box::new(MarkdownFormatter),
            ExportFormat::Html => Box::new(HtmlFormatter),
        }
    }
}

/// Denormalized projection of a case for export.
///
/// Immutable value object: suite and section names are resolved, steps
/// decoded, custom fields collected, and scenario tags synthesized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseExport {
    pub id: u64,
    pub title: String,
    pub section_id: u64,
    pub section_name: Option<String>,
    pub suite_id: u64,
    pub suite_name: Option<String>,
    pub priority_id: Option<u64>,
    pub type_id: Option<u64>,
    pub refs: Option<String>,
    pub description: Option<String>,
    pub preconditions: Option<String>,
    pub expected: Option<String>,
    pub steps: Option<Vec<CaseStep>>,
    pub custom_fields: BTreeMap<String, serde_json::Value>,
    pub tags: Vec<String>,
}

impl TestCaseExport {
    /// Denormalize a case against its suite and section lookup.
    fn from_case(case: &Case, suite: &Suite, section_names: &HashMap<u64, String>) -> Self {
        Self {
            id: case.id,
            title: case.title.clone(),
            section_id: case.section_id,
            section_name: section_names.get(&case.section_id).cloned(),
            suite_id: suite.id,
            suite_name: Some(suite.name.clone()),
            priority_id: case.priority_id,
            type_id: case.type_id,
            refs: case.refs.clone(),
            description: case.custom_description.clone(),
            preconditions: case.custom_preconds.clone(),
            expected: case.custom_expected.clone(),
            steps: case.steps(),
            custom_fields: case.custom_fields(),
            tags: case.derived_tags(),
        }
    }
}

/// Exports TestRail cases through the cached service facade.
pub struct TestCaseExporter<'a> {
    service: &'a mut TestRailService,
}

impl<'a> TestCaseExporter<'a> {
    /// Create a new exporter over a service instance.
    pub fn new(service: &'a mut TestRailService) -> Self {
        Self { service }
    }

    /// Export the cases referenced by case-ID tags in `tags`.
    ///
    /// Suites are taken from `@testsuite:` tags, falling back to the
    /// configured default suite, falling back to every suite of the
    /// project. A suite that fails to load is logged and skipped; the
    /// remaining suites are still processed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the initial suite enumeration fails; no
    /// case-ID tags in the input is not an error and yields an empty list.
    pub async fn export_by_tags<S: AsRef<str>>(
        &mut self,
        tags: &[S],
    ) -> Result<Vec<TestCaseExport>> {
        let case_ids = extract_case_ids_from_tags(tags);
        if case_ids.is_empty() {
            warn!("No TestRail case IDs found in provided tags");
            return Ok(Vec::new());
        }

        let mut suite_ids = extract_suite_ids_from_tags(tags);
        if suite_ids.is_empty()
            && let Some(default_suite_id) = self.service.default_suite_id()
        {
            suite_ids.push(default_suite_id);
        }

        if suite_ids.is_empty() {
            let all_suites = self.service.get_suites().await?;
            suite_ids.extend(all_suites.iter().map(|suite| suite.id));
        }

        let mut result = Vec::new();
        for suite_id in suite_ids {
            match self.collect_suite_cases(suite_id, Some(&case_ids)).await {
                Ok(mut exports) => result.append(&mut exports),
                Err(e) => error!("Error processing suite ID {suite_id}: {e}"),
            }
        }

        Ok(result)
    }

    /// Export every case of a suite, optionally filtered by a
    /// case-insensitive regex over title and refs.
    ///
    /// # Errors
    ///
    /// Returns an error if the suite, its sections or its cases cannot be
    /// fetched.
    pub async fn export_suite(
        &mut self,
        suite_id: u64,
        filter: Option<&str>,
    ) -> Result<Vec<TestCaseExport>> {
        let filter = match filter {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        SyncError::InvalidConfig(format!("invalid case filter '{pattern}': {e}"))
                    })?,
            ),
            None => None,
        };

        let mut exports = self.collect_suite_cases(suite_id, None).await?;
        if let Some(filter) = filter {
            exports.retain(|export| {
                filter.is_match(&export.title)
                    || export
                        .refs
                        .as_deref()
                        .is_some_and(|refs| filter.is_match(refs))
            });
        }
        Ok(exports)
    }

    /// Fetch a suite's cases and denormalize those passing the optional
    /// case-ID membership filter.
    async fn collect_suite_cases(
        &mut self,
        suite_id: u64,
        case_ids: Option<&[u64]>,
    ) -> Result<Vec<TestCaseExport>> {
        let suite = self.service.get_suite(suite_id).await?;
        let sections = self.service.get_sections(suite_id).await?;
        let cases = self.service.get_cases_by_suite(suite_id).await?;

        let section_names: HashMap<u64, String> = sections
            .into_iter()
            .map(|section| (section.id, section.name))
            .collect();

        let exports = cases
            .iter()
            .filter(|case| case_ids.is_none_or(|ids| ids.contains(&case.id)))
            .map(|case| TestCaseExport::from_case(case, &suite, &section_names))
            .collect();

        Ok(exports)
    }
}

/// Render test cases in the selected format.
pub fn render(test_cases: &[TestCaseExport], format: ExportFormat) -> String {
    format.formatter().format(test_cases)
}

/// Render test cases and write them to a file, creating intermediate
/// directories as needed. An existing file is overwritten.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be written.
pub fn export_to_file(
    test_cases: &[TestCaseExport],
    output_path: &Path,
    format: ExportFormat,
) -> Result<()> {
    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let content = render(test_cases, format);
    std::fs::write(output_path, content)?;
    info!(
        "Exported {} test case(s) to {}",
        test_cases.len(),
        output_path.display()
    );
    Ok(())
}

/// Turn a suite name into a safe lowercase file stem.
pub fn safe_file_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut last_was_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            result.push('-');
            last_was_dash = true;
        }
    }
    result.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_export() -> TestCaseExport {
        TestCaseExport {
            id: 12345,
            title: "Login with valid credentials".to_string(),
            section_id: 10,
            section_name: Some("Authentication".to_string()),
            suite_id: 2,
            suite_name: Some("Master".to_string()),
            priority_id: Some(3),
            type_id: Some(6),
            refs: Some("ABC-1".to_string()),
            description: Some("Verify the login flow".to_string()),
            preconditions: None,
            expected: None,
            steps: Some(vec![CaseStep {
                content: "Open the page".to_string(),
                expected: "Page is shown".to_string(),
            }]),
            custom_fields: BTreeMap::new(),
            tags: vec!["@testrail:C12345".to_string(), "@testsuite:2".to_string()],
        }
    }

    #[test]
    fn test_format_from_arg() {
        assert_eq!(ExportFormat::from_arg("json"), ExportFormat::Json);
        assert_eq!(ExportFormat::from_arg("CSV"), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_arg("md"), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_arg("markdown"), ExportFormat::Markdown);
        assert_eq!(ExportFormat::from_arg("html"), ExportFormat::Html);
        // unknown falls back to markdown
        assert_eq!(ExportFormat::from_arg("xml"), ExportFormat::Markdown);
    }

    #[test]
    fn test_json_roundtrip() {
        let exports = vec![sample_export()];
        let rendered = render(&exports, ExportFormat::Json);
        let parsed: Vec<TestCaseExport> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].id, exports[0].id);
        assert_eq!(parsed[0].title, exports[0].title);
        assert_eq!(parsed[0].steps, exports[0].steps);
        assert_eq!(parsed[0].tags, exports[0].tags);
    }

    #[test]
    fn test_export_to_file_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deep/cases.json");

        export_to_file(&[sample_export()], &path, ExportFormat::Json).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("Login with valid credentials"));
    }

    #[test]
    fn test_export_to_file_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cases.md");
        std::fs::write(&path, "stale").unwrap();

        export_to_file(&[], &path, ExportFormat::Markdown).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "# No test cases found");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("Master Suite (v2)"), "master-suite-v2");
        assert_eq!(safe_file_name("API / Checkout"), "api-checkout");
        assert_eq!(safe_file_name("simple"), "simple");
    }
}
