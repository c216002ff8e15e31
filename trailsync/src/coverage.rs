//! Test case coverage checking against feature files.
//!
//! Scans a directory of Gherkin feature files, maps scenarios to TestRail
//! cases through their tags, and reports which cases are covered, which are
//! missing, and which scenarios carry no TestRail mapping at all.

use glob::glob;
use log::info;
use serde::Serialize;
use std::path::Path;

use testrail_platform::case::{Case, priority_name};
use testrail_platform::TestRailService;

use crate::error::{Result, SyncError};
use crate::tags::extract_case_id;

/// A TestRail case that has a mapped scenario.
#[derive(Debug, Clone, Serialize)]
pub struct CoveredCase {
    pub id: u64,
    pub title: String,
    pub feature_file: String,
}

/// A TestRail case with no mapped scenario.
#[derive(Debug, Clone, Serialize)]
pub struct MissingCase {
    pub id: u64,
    pub title: String,
    pub priority: String,
}

/// A scenario that carries no TestRail case tag.
#[derive(Debug, Clone, Serialize)]
pub struct UnmappedScenario {
    pub name: String,
    pub feature_file: String,
    pub tags: Vec<String>,
}

/// Coverage report over a whole project.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageSummary {
    pub total: usize,
    pub covered: usize,
    pub missing: usize,
    pub percentage: u32,
    pub covered_cases: Vec<CoveredCase>,
    pub missing_cases: Vec<MissingCase>,
    pub unmapped_scenarios: Vec<UnmappedScenario>,
}

/// A scenario extracted from a feature file, with its combined tags.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScenario {
    pub name: String,
    pub tags: Vec<String>,
}

/// Extract scenarios and their tags from feature file content.
///
/// Line-based: a tag line preceding `Feature:` contributes feature-level
/// tags to every scenario; a tag line preceding a scenario applies to that
/// scenario only.
pub fn extract_scenarios(content: &str) -> Vec<FeatureScenario> {
    let mut scenarios = Vec::new();
    let mut current_tags: Vec<String> = Vec::new();
    let mut feature_tags: Vec<String> = Vec::new();

    let lines: Vec<&str> = content.lines().collect();
    for (i, raw_line) in lines.iter().enumerate() {
        let line = raw_line.trim();

        if line.starts_with('@') {
            current_tags = line
                .split_whitespace()
                .filter(|token| token.starts_with('@'))
                .map(String::from)
                .collect();

            // A tag line right above the Feature header holds feature tags.
            if lines
                .get(i + 1)
                .is_some_and(|next| next.trim().starts_with("Feature:"))
            {
                feature_tags = std::mem::take(&mut current_tags);
            }
        } else if line.starts_with("Scenario:") || line.starts_with("Scenario Outline:") {
            let name = line
                .split_once(':')
                .map(|(_, rest)| rest.trim().to_string())
                .unwrap_or_default();

            let mut tags = feature_tags.clone();
            tags.append(&mut current_tags);

            scenarios.push(FeatureScenario { name, tags });
        }
    }

    scenarios
}

/// Sort key for missing cases: Critical first, then by ID.
fn priority_order(priority: &str) -> u8 {
    match priority {
        "Critical" => 0,
        "High" => 1,
        "Medium" => 2,
        "Low" => 3,
        _ => 4,
    }
}

/// Whether a case carries any of the required tags.
fn has_required_tag(case: &Case, required_tags: &[String]) -> bool {
    if required_tags.is_empty() {
        return true;
    }
    let case_tags = case.derived_tags();
    required_tags.iter().any(|tag| case_tags.contains(tag))
}

/// Round a covered/total ratio to a whole percentage.
///
/// A project with zero cases is defined as fully covered: there is nothing
/// left to map, so the ratio is 100 rather than undefined.
fn coverage_percentage(covered: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    ((covered as f64 / total as f64) * 100.0).round() as u32
}

/// Check coverage of the project's cases against a features directory.
///
/// # Errors
///
/// Returns an error when TestRail cannot be queried or the features
/// directory cannot be scanned.
pub async fn check_coverage(
    service: &mut TestRailService,
    features_dir: &Path,
    required_tags: &[String],
) -> Result<CoverageSummary> {
    info!("Fetching test cases from TestRail...");
    let suites = service.get_suites().await?;

    let mut all_cases = Vec::new();
    for suite in &suites {
        info!("Fetching cases for suite: {}", suite.name);
        let cases = service.get_cases_by_suite(suite.id).await?;
        all_cases.extend(cases);
    }
    info!("Found {} total test cases in TestRail", all_cases.len());

    let pattern = features_dir.join("**/*.feature");
    let pattern = pattern.to_string_lossy().into_owned();
    let feature_files: Vec<_> = glob(&pattern)
        .map_err(|e| SyncError::InvalidConfig(format!("invalid features path: {e}")))?
        .filter_map(std::result::Result::ok)
        .collect();
    info!("Found {} feature files", feature_files.len());

    let mut covered_cases = Vec::new();
    let mut unmapped_scenarios = Vec::new();

    for file in &feature_files {
        let content = std::fs::read_to_string(file)?;
        let display_path = file.to_string_lossy().into_owned();

        for scenario in extract_scenarios(&content) {
            let case_id = scenario.tags.iter().find_map(|tag| extract_case_id(tag));
            match case_id {
                Some(id) => covered_cases.push(CoveredCase {
                    id,
                    title: scenario.name,
                    feature_file: display_path.clone(),
                }),
                None => unmapped_scenarios.push(UnmappedScenario {
                    name: scenario.name,
                    feature_file: display_path.clone(),
                    tags: scenario.tags,
                }),
            }
        }
    }

    let covered_ids: std::collections::HashSet<u64> =
        covered_cases.iter().map(|c| c.id).collect();

    let mut missing_cases: Vec<MissingCase> = all_cases
        .iter()
        .filter(|case| !covered_ids.contains(&case.id))
        .filter(|case| has_required_tag(case, required_tags))
        .map(|case| MissingCase {
            id: case.id,
            title: case.title.clone(),
            priority: priority_name(case.priority_id).to_string(),
        })
        .collect();
    missing_cases.sort_by(|a, b| {
        priority_order(&a.priority)
            .cmp(&priority_order(&b.priority))
            .then(a.id.cmp(&b.id))
    });

    Ok(CoverageSummary {
        total: all_cases.len(),
        covered: covered_cases.len(),
        missing: missing_cases.len(),
        percentage: coverage_percentage(covered_cases.len(), all_cases.len()),
        covered_cases,
        missing_cases,
        unmapped_scenarios,
    })
}

/// Print the human-readable coverage summary to standard output.
pub fn print_summary(summary: &CoverageSummary) {
    println!("\n=== TestRail Coverage Summary ===");
    println!("Total Test Cases: {}", summary.total);
    println!("Covered Test Cases: {}", summary.covered);
    println!("Missing Test Cases: {}", summary.missing);
    println!("Coverage Percentage: {}%", summary.percentage);

    if !summary.missing_cases.is_empty() {
        println!("\nMissing Test Cases:");
        for case in &summary.missing_cases {
            println!("- C{} [{}] {}", case.id, case.priority, case.title);
        }
    }

    if !summary.unmapped_scenarios.is_empty() {
        println!("\nUnmapped Scenarios:");
        for scenario in &summary.unmapped_scenarios {
            println!("- {} ({})", scenario.name, scenario.feature_file);
            if !scenario.tags.is_empty() {
                println!("  Tags: {}", scenario.tags.join(", "));
            }
        }
    }
}
