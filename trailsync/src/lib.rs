//! Trailsync - TestRail synchronization for Cucumber test suites.
//!
//! Reconciles Cucumber scenario tags with TestRail test cases and runs:
//! tag-driven metadata resolution, case export in four document formats,
//! result reporting against runs, and case coverage checks over feature
//! files.

pub mod cli;
pub mod coverage;
pub mod credentials;
pub mod error;
pub mod export;
pub mod formatters;
pub mod report;
pub mod runs;
pub mod tags;

pub use cli::{Args, Commands};
pub use coverage::{CoverageSummary, check_coverage, extract_scenarios, print_summary};
pub use credentials::{CredentialError, SecurePassword, load_testrail_config, run_id_from_env};
pub use error::{Result, SyncError};
pub use export::{
    ExportFormat, TestCaseExport, TestCaseExporter, export_to_file, render, safe_file_name,
};
pub use formatters::{
    CsvFormatter, HtmlFormatter, JsonFormatter, MarkdownFormatter, TestCaseFormatter,
    escape_html, format_html_content, format_steps_as_string,
};
pub use report::{
    CucumberFeature, CucumberScenario, CucumberStep, RESULT_BATCH_SIZE, ScenarioStatus,
    collect_results, load_cucumber_report, map_status, scenario_status, submit_results,
};
pub use runs::{RunInfo, default_run_info_path, load_run_info, resolve_run_id, save_run_info};
pub use tags::{
    Label, LabelRule, Link, LinkRule, ParsedTag, TagConfig, TagParser, TagValue, UrlTemplate,
    decode_value, extract_case_id, extract_case_ids_from_tags, extract_suite_id,
    extract_suite_ids_from_tags, format_elapsed, format_for_cucumber, is_supported_tag,
    parse_tags_string, validate_tags,
};
