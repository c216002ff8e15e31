//! Result reporting pipeline: Cucumber JSON execution reports to TestRail.
//!
//! Consumes the Cucumber JSON format (features → scenarios → steps),
//! aggregates per-scenario outcomes, and submits them as TestRail results in
//! fixed-size batches against the current run.

use log::{info, warn};
use serde::Deserialize;
use std::path::Path;

use testrail_platform::results::{TestResult, TestStatus};
use testrail_platform::TestRailService;

use crate::error::{Result, SyncError};
use crate::tags::{extract_case_id, format_elapsed};

/// Results are submitted in chunks of this size to avoid overwhelming the
/// API.
pub const RESULT_BATCH_SIZE: usize = 50;

/// A tag entry of the Cucumber JSON format.
#[derive(Debug, Clone, Deserialize)]
pub struct CucumberTag {
    pub name: String,
}

/// A data table row attached to a step.
#[derive(Debug, Clone, Deserialize)]
pub struct DataRow {
    #[serde(default)]
    pub cells: Vec<String>,
}

/// The result block of a step: status, duration in nanoseconds, optional
/// error message.
#[derive(Debug, Clone, Deserialize)]
pub struct StepResult {
    pub status: String,
    #[serde(default)]
    pub duration: u64,
    pub error_message: Option<String>,
}

/// A single step of a scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct CucumberStep {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub name: String,
    pub result: Option<StepResult>,
    #[serde(default)]
    pub rows: Vec<DataRow>,
}

/// A scenario (or background) element of a feature.
#[derive(Debug, Clone, Deserialize)]
pub struct CucumberScenario {
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<CucumberTag>,
    #[serde(default)]
    pub steps: Vec<CucumberStep>,
}

/// A feature entry of the Cucumber JSON report.
#[derive(Debug, Clone, Deserialize)]
pub struct CucumberFeature {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<CucumberTag>,
    #[serde(default)]
    pub elements: Vec<CucumberScenario>,
}

/// Aggregate outcome of a scenario, derived from its step statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Pending,
    Skipped,
    Undefined,
    Unknown,
}

/// Derive the aggregate status of a scenario from its steps.
///
/// Any failed step fails the scenario regardless of position; undefined or
/// pending steps make it pending; all-skipped (with nothing passed) makes it
/// skipped; only an all-passed scenario passes.
pub fn scenario_status(scenario: &CucumberScenario) -> ScenarioStatus {
    if scenario.steps.is_empty() {
        return ScenarioStatus::Undefined;
    }

    let statuses: Vec<&str> = scenario
        .steps
        .iter()
        .map(|step| step.result.as_ref().map_or("unknown", |r| r.status.as_str()))
        .collect();

    if statuses.contains(&"failed") {
        return ScenarioStatus::Failed;
    }
    if statuses.contains(&"undefined") || statuses.contains(&"pending") {
        return ScenarioStatus::Pending;
    }
    if statuses.contains(&"skipped") && !statuses.contains(&"passed") {
        return ScenarioStatus::Skipped;
    }
    if statuses.iter().all(|status| *status == "passed") {
        return ScenarioStatus::Passed;
    }

    ScenarioStatus::Unknown
}

/// Map an aggregate scenario status to the TestRail status code.
pub fn map_status(status: ScenarioStatus) -> TestStatus {
    match status {
        ScenarioStatus::Passed => TestStatus::Passed,
        ScenarioStatus::Failed => TestStatus::Failed,
        ScenarioStatus::Skipped | ScenarioStatus::Undefined => TestStatus::Skipped,
        ScenarioStatus::Pending => TestStatus::Blocked,
        ScenarioStatus::Unknown => TestStatus::Untested,
    }
}

/// Total scenario duration in nanoseconds.
fn scenario_duration_ns(scenario: &CucumberScenario) -> u64 {
    scenario
        .steps
        .iter()
        .filter_map(|step| step.result.as_ref())
        .map(|result| result.duration)
        .sum()
}

/// Format a nanosecond duration as a TestRail elapsed string, rounding up
/// to whole seconds. Zero durations yield no elapsed value.
fn elapsed_from_ns(duration_ns: u64) -> Option<String> {
    if duration_ns == 0 {
        return None;
    }
    let seconds = duration_ns.div_ceil(1_000_000_000);
    Some(format_elapsed(seconds))
}

/// Build the human-readable result comment: a transcript of the scenario
/// with per-step status, truncated error messages and data tables.
fn build_comment(feature: &CucumberFeature, scenario: &CucumberScenario) -> String {
    let mut comment = format!("Feature: {}\n", feature.name);
    comment.push_str(&format!("Scenario: {}\n\n", scenario.name));

    comment.push_str("Steps:\n");
    for step in &scenario.steps {
        let status = step.result.as_ref().map_or("unknown", |r| r.status.as_str());
        comment.push_str(&format!("- {}{} ({})\n", step.keyword, step.name, status));

        if status == "failed"
            && let Some(error_message) = step.result.as_ref().and_then(|r| r.error_message.as_ref())
        {
            let error_lines: Vec<&str> = error_message.split('\n').collect();
            let formatted = error_lines
                .iter()
                .take(5)
                .copied()
                .collect::<Vec<_>>()
                .join("\n  ");
            let ellipsis = if error_lines.len() > 5 { "\n  ..." } else { "" };
            comment.push_str(&format!("  Error: {formatted}{ellipsis}\n"));
        }

        if !step.rows.is_empty() {
            comment.push_str("  Data Table:\n");
            for row in &step.rows {
                comment.push_str(&format!("    | {} |\n", row.cells.join(" | ")));
            }
        }
    }

    comment
}

/// Convert a Cucumber report into TestRail results.
///
/// Scenarios without a TestRail case-ID tag are skipped silently; feature
/// and scenario tags are combined, first matching tag wins.
pub fn collect_results(features: &[CucumberFeature]) -> Vec<TestResult> {
    let mut results = Vec::new();

    for feature in features {
        for element in &feature.elements {
            if element.element_type != "scenario" {
                continue;
            }

            let case_id = feature
                .tags
                .iter()
                .chain(element.tags.iter())
                .find_map(|tag| extract_case_id(&tag.name));
            let Some(case_id) = case_id else {
                continue;
            };

            let status = map_status(scenario_status(element));
            let elapsed = elapsed_from_ns(scenario_duration_ns(element));
            let comment = build_comment(feature, element);

            results.push(TestResult {
                case_id,
                status_id: status,
                comment: Some(comment),
                elapsed,
                defects: None,
                version: None,
            });
        }
    }

    results
}

/// Read and parse a Cucumber JSON report file.
///
/// # Errors
///
/// Returns an error when the file is missing or does not parse as a
/// Cucumber report.
pub fn load_cucumber_report(path: &Path) -> Result<Vec<CucumberFeature>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SyncError::ResultsFile(format!("cannot read {}: {e}", path.display()))
    })?;
    let features: Vec<CucumberFeature> = serde_json::from_str(&content).map_err(|e| {
        SyncError::ResultsFile(format!("cannot parse {}: {e}", path.display()))
    })?;
    Ok(features)
}

/// Submit results against the current run in fixed-size batches.
///
/// Batches are sent sequentially; a failing batch aborts the remaining
/// ones.
///
/// # Errors
///
/// Returns an error when no run ID is set or a batch submission fails.
pub async fn submit_results(
    service: &TestRailService,
    results: &[TestResult],
) -> Result<usize> {
    if results.is_empty() {
        warn!("No results to report");
        return Ok(0);
    }

    let batch_count = results.len().div_ceil(RESULT_BATCH_SIZE);
    for (index, batch) in results.chunks(RESULT_BATCH_SIZE).enumerate() {
        service.add_results(batch).await?;
        info!("Reported batch {}/{batch_count}", index + 1);
    }

    Ok(results.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(status: &str, duration: u64) -> CucumberStep {
        CucumberStep {
            keyword: "Given ".to_string(),
            name: "a step".to_string(),
            result: Some(StepResult {
                status: status.to_string(),
                duration,
                error_message: None,
            }),
            rows: Vec::new(),
        }
    }

    fn scenario(steps: Vec<CucumberStep>) -> CucumberScenario {
        CucumberScenario {
            element_type: "scenario".to_string(),
            name: "a scenario".to_string(),
            tags: vec![CucumberTag {
                name: "@testrail:C12345".to_string(),
            }],
            steps,
        }
    }

    #[test]
    fn test_status_all_passed() {
        let s = scenario(vec![step("passed", 0), step("passed", 0)]);
        assert_eq!(scenario_status(&s), ScenarioStatus::Passed);
    }

    #[test]
    fn test_status_failed_wins_regardless_of_order() {
        let s = scenario(vec![step("passed", 0), step("failed", 0), step("passed", 0)]);
        assert_eq!(scenario_status(&s), ScenarioStatus::Failed);

        let s = scenario(vec![step("failed", 0), step("passed", 0)]);
        assert_eq!(scenario_status(&s), ScenarioStatus::Failed);
    }

    #[test]
    fn test_status_pending_and_skipped() {
        let s = scenario(vec![step("passed", 0), step("undefined", 0)]);
        assert_eq!(scenario_status(&s), ScenarioStatus::Pending);

        let s = scenario(vec![step("skipped", 0), step("skipped", 0)]);
        assert_eq!(scenario_status(&s), ScenarioStatus::Skipped);

        // a passed step among skipped ones is not a skipped scenario
        let s = scenario(vec![step("passed", 0), step("skipped", 0)]);
        assert_eq!(scenario_status(&s), ScenarioStatus::Unknown);
    }

    #[test]
    fn test_status_empty_steps_is_undefined() {
        let s = scenario(Vec::new());
        assert_eq!(scenario_status(&s), ScenarioStatus::Undefined);
        assert_eq!(map_status(ScenarioStatus::Undefined), TestStatus::Skipped);
    }

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(map_status(ScenarioStatus::Passed), TestStatus::Passed);
        assert_eq!(map_status(ScenarioStatus::Failed), TestStatus::Failed);
        assert_eq!(map_status(ScenarioStatus::Skipped), TestStatus::Skipped);
        assert_eq!(map_status(ScenarioStatus::Pending), TestStatus::Blocked);
        assert_eq!(map_status(ScenarioStatus::Unknown), TestStatus::Untested);
    }

    #[test]
    fn test_elapsed_rounds_up_to_whole_seconds() {
        let s = scenario(vec![step("passed", 1_500_000_000), step("passed", 1_000_000_000)]);
        assert_eq!(elapsed_from_ns(scenario_duration_ns(&s)), Some("3s".to_string()));
    }

    #[test]
    fn test_elapsed_formats_minutes() {
        assert_eq!(elapsed_from_ns(150_000_000_000), Some("2m 30s".to_string()));
        assert_eq!(elapsed_from_ns(0), None);
    }

    #[test]
    fn test_comment_truncates_error_to_five_lines() {
        let mut failing = step("failed", 0);
        failing.result = Some(StepResult {
            status: "failed".to_string(),
            duration: 0,
            error_message: Some("l1\nl2\nl3\nl4\nl5\nl6\nl7".to_string()),
        });
        let s = scenario(vec![failing]);
        let feature = CucumberFeature {
            name: "Checkout".to_string(),
            tags: Vec::new(),
            elements: vec![s.clone()],
        };

        let comment = build_comment(&feature, &s);
        assert!(comment.starts_with("Feature: Checkout\nScenario: a scenario\n"));
        assert!(comment.contains("Error: l1\n  l2\n  l3\n  l4\n  l5\n  ...\n"));
        assert!(!comment.contains("l6"));
    }

    #[test]
    fn test_comment_renders_data_table() {
        let mut with_table = step("passed", 0);
        with_table.rows = vec![
            DataRow {
                cells: vec!["user".to_string(), "password".to_string()],
            },
            DataRow {
                cells: vec!["alice".to_string(), "secret".to_string()],
            },
        ];
        let s = scenario(vec![with_table]);
        let feature = CucumberFeature {
            name: "Login".to_string(),
            tags: Vec::new(),
            elements: vec![s.clone()],
        };

        let comment = build_comment(&feature, &s);
        assert!(comment.contains("  Data Table:\n    | user | password |\n    | alice | secret |\n"));
    }

    #[test]
    fn test_collect_results_skips_untagged_and_non_scenarios() {
        let report = r#"[{
            "name": "Login",
            "tags": [{"name": "@smoke"}],
            "elements": [
                {"type": "background", "name": "setup", "tags": [], "steps": []},
                {"type": "scenario", "name": "tagged", "tags": [{"name": "@testrail:C7"}],
                 "steps": [{"keyword": "Given ", "name": "x", "result": {"status": "passed", "duration": 100}}]},
                {"type": "scenario", "name": "untagged", "tags": [], "steps": []}
            ]
        }]"#;
        let features: Vec<CucumberFeature> = serde_json::from_str(report).unwrap();

        let results = collect_results(&features);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, 7);
        assert_eq!(results[0].status_id, TestStatus::Passed);
    }

    #[test]
    fn test_collect_results_uses_feature_level_tag() {
        let report = r#"[{
            "name": "Login",
            "tags": [{"name": "@testrail:C99"}],
            "elements": [
                {"type": "scenario", "name": "inherits", "tags": [],
                 "steps": [{"keyword": "When ", "name": "y", "result": {"status": "failed", "duration": 0, "error_message": "boom"}}]}
            ]
        }]"#;
        let features: Vec<CucumberFeature> = serde_json::from_str(report).unwrap();

        let results = collect_results(&features);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].case_id, 99);
        assert_eq!(results[0].status_id, TestStatus::Failed);
    }

    #[test]
    fn test_batch_arithmetic() {
        // 120 results are submitted as exactly three ordered batches
        let results: Vec<u32> = (0..120).collect();
        let batches: Vec<&[u32]> = results.chunks(RESULT_BATCH_SIZE).collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 50);
        assert_eq!(batches[1].len(), 50);
        assert_eq!(batches[2].len(), 20);
        assert_eq!(batches[0][0], 0);
        assert_eq!(batches[2][19], 119);
    }
}
