//! Command line interface definition.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trailsync")]
#[command(
    about = "Reconciles Cucumber scenario tags with TestRail: run creation, case export, result reporting and coverage checks."
)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug mode for detailed output
    #[arg(
        long = "debug",
        short = 'd',
        help = "Enable debug mode for detailed diagnostic output",
        global = true
    )]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new TestRail run and persist its ID for later commands
    CreateRun {
        /// Name for the test run
        #[arg(long = "name", short = 'n', help = "Name of the test run")]
        name: Option<String>,

        /// Description for the test run
        #[arg(long = "description", help = "Description of the test run")]
        description: Option<String>,

        /// Restrict the run to specific case IDs (comma-separated)
        #[arg(long = "case-ids", help = "Case IDs to include (e.g., '1,2,3'); all suite cases when omitted", value_parser = validate_id_list)]
        case_ids: Option<String>,
    },

    /// Export TestRail test cases to JSON/CSV/Markdown/HTML documents
    ExportCases {
        /// Tags carrying case and suite IDs to export
        #[arg(long = "tags", help = "Comma-separated tags (e.g., '@testrail:C1,@testsuite:2'); exports whole suites when omitted")]
        tags: Option<String>,

        /// Export a single suite instead of all project suites
        #[arg(long = "suite-id", help = "Suite ID to export")]
        suite_id: Option<u64>,

        /// Export format
        #[arg(long = "format", help = "Export format (json, csv, markdown, html)", default_value = "markdown", value_parser = validate_export_format)]
        format: String,

        /// Output directory for the exported files
        #[arg(
            long = "output",
            short = 'o',
            help = "Output directory for exported files",
            default_value = "test-cases"
        )]
        output: String,

        /// Case filter applied to title and references
        #[arg(long = "filter", help = "Case-insensitive regex filter on case title/refs")]
        filter: Option<String>,
    },

    /// Report Cucumber JSON results to a TestRail run
    ReportResults {
        /// Path to the Cucumber JSON results file
        #[arg(
            long = "results",
            short = 'r',
            help = "Path to the Cucumber JSON results file",
            default_value = "allure-results/cucumber-results.json"
        )]
        results: String,

        /// TestRail run ID to report against
        #[arg(long = "run-id", help = "Run ID (falls back to TESTRAIL_RUN_ID, then the persisted run file)")]
        run_id: Option<u64>,

        /// Close the run after reporting
        #[arg(long = "close-run", help = "Close the TestRail run after reporting")]
        close_run: bool,
    },

    /// Check TestRail case coverage of the feature files
    CheckCoverage {
        /// Directory containing the feature files
        #[arg(
            long = "features",
            help = "Directory to scan for *.feature files",
            default_value = "features"
        )]
        features: String,

        /// Output mode
        #[arg(long = "output", help = "Output mode (stdout, json)", default_value = "stdout", value_parser = validate_coverage_output)]
        output: String,

        /// Report file used with --output json
        #[arg(
            long = "file",
            help = "Report file path for JSON output",
            default_value = "coverage-report.json"
        )]
        file: String,

        /// Only count cases carrying one of these tags as missing
        #[arg(long = "required", help = "Comma-separated required tags (e.g., '@smoke,@critical')")]
        required: Option<String>,

        /// Fail when coverage is below 100%
        #[arg(long = "strict", help = "Exit non-zero when coverage is below 100%")]
        strict: bool,
    },
}

/// Validate the export format argument.
fn validate_export_format(value: &str) -> Result<String, String> {
    match value.to_lowercase().as_str() {
        "json" | "csv" | "markdown" | "md" | "html" => Ok(value.to_lowercase()),
        _ => Err(format!(
            "invalid export format '{value}' (expected json, csv, markdown or html)"
        )),
    }
}

/// Validate the coverage output mode argument.
fn validate_coverage_output(value: &str) -> Result<String, String> {
    match value.to_lowercase().as_str() {
        "stdout" | "json" => Ok(value.to_lowercase()),
        _ => Err(format!(
            "invalid output mode '{value}' (expected stdout or json)"
        )),
    }
}

/// Validate a comma-separated list of numeric IDs.
fn validate_id_list(value: &str) -> Result<String, String> {
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() || entry.parse::<u64>().is_err() {
            return Err(format!("invalid ID list '{value}' (expected e.g. '1,2,3')"));
        }
    }
    Ok(value.to_string())
}

/// Parse a validated comma-separated ID list into numbers.
pub fn parse_id_list(value: &str) -> Vec<u64> {
    value
        .split(',')
        .filter_map(|entry| entry.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_export_format() {
        assert_eq!(validate_export_format("JSON").unwrap(), "json");
        assert_eq!(validate_export_format("md").unwrap(), "md");
        assert!(validate_export_format("xml").is_err());
    }

    #[test]
    fn test_validate_coverage_output() {
        assert_eq!(validate_coverage_output("stdout").unwrap(), "stdout");
        assert!(validate_coverage_output("yaml").is_err());
    }

    #[test]
    fn test_validate_and_parse_id_list() {
        assert!(validate_id_list("1,2,3").is_ok());
        assert!(validate_id_list("1, 2").is_ok());
        assert!(validate_id_list("1,two").is_err());
        assert!(validate_id_list("").is_err());
        assert_eq!(parse_id_list("1, 2,3"), vec![1, 2, 3]);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from([
            "trailsync",
            "report-results",
            "--results",
            "out.json",
            "--close-run",
        ])
        .unwrap();
        match args.command {
            Commands::ReportResults {
                results,
                run_id,
                close_run,
            } => {
                assert_eq!(results, "out.json");
                assert_eq!(run_id, None);
                assert!(close_run);
            }
            _ => panic!("expected report-results"),
        }
    }
}
