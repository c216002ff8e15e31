//! Trailsync - TestRail synchronization tool for Cucumber test suites.
use clap::Parser;
use log::{error, info, warn};
use std::path::Path;

use testrail_platform::TestRailService;
use trailsync::{
    Result, SyncError, cli,
    cli::Commands,
    coverage, credentials, export,
    export::{ExportFormat, TestCaseExporter},
    report, runs,
};

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    // Initialize logging
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(args).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: cli::Args) -> Result<()> {
    // Load TestRail connection settings from the environment
    let config = credentials::load_testrail_config()?;
    let mut service = TestRailService::new(config)?;

    match args.command {
        Commands::CreateRun {
            name,
            description,
            case_ids,
        } => {
            run_create_run(
                &mut service,
                name.as_deref(),
                description.as_deref(),
                case_ids.as_deref().map(cli::parse_id_list),
            )
            .await
        }
        Commands::ExportCases {
            tags,
            suite_id,
            format,
            output,
            filter,
        } => {
            run_export_cases(
                &mut service,
                tags.as_deref(),
                suite_id,
                ExportFormat::from_arg(&format),
                Path::new(&output),
                filter.as_deref(),
            )
            .await
        }
        Commands::ReportResults {
            results,
            run_id,
            close_run,
        } => run_report_results(&mut service, Path::new(&results), run_id, close_run).await,
        Commands::CheckCoverage {
            features,
            output,
            file,
            required,
            strict,
        } => {
            let required_tags: Vec<String> = required
                .as_deref()
                .map(|value| {
                    value
                        .split(',')
                        .map(|tag| tag.trim().to_string())
                        .filter(|tag| !tag.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            run_check_coverage(
                &mut service,
                Path::new(&features),
                &output,
                Path::new(&file),
                &required_tags,
                strict,
            )
            .await
        }
    }
}

/// Create a new run and persist its ID for later commands.
async fn run_create_run(
    service: &mut TestRailService,
    name: Option<&str>,
    description: Option<&str>,
    case_ids: Option<Vec<u64>>,
) -> Result<()> {
    info!("Creating new TestRail run...");

    let run = service.create_run(name, description, case_ids).await?;
    info!("Created TestRail run with ID: {}", run.id);

    runs::save_run_info(&runs::default_run_info_path(), &run)?;

    println!("{}", run.id);
    Ok(())
}

/// Export test cases either by tags (single document) or whole suites (one
/// document per suite).
async fn run_export_cases(
    service: &mut TestRailService,
    tags: Option<&str>,
    suite_id: Option<u64>,
    format: ExportFormat,
    output_dir: &Path,
    filter: Option<&str>,
) -> Result<()> {
    info!("Exporting test cases from TestRail...");

    if let Some(tags) = tags {
        let tag_list: Vec<String> = tags
            .split(',')
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();

        let mut exporter = TestCaseExporter::new(service);
        let exports = exporter.export_by_tags(&tag_list).await?;

        let output_file = output_dir.join(format!("test-cases.{}", format.extension()));
        export::export_to_file(&exports, &output_file, format)?;
        info!("Export completed successfully");
        return Ok(());
    }

    // Whole-suite export: explicit suite, or every suite of the project
    let suites = match suite_id {
        Some(id) => vec![service.get_suite(id).await?],
        None => service.get_suites().await?,
    };
    info!("Exporting test cases from {} suite(s)...", suites.len());

    for suite in &suites {
        info!("Processing suite: {} (ID: {})", suite.name, suite.id);

        let mut exporter = TestCaseExporter::new(service);
        let exports = exporter.export_suite(suite.id, filter).await?;
        info!(
            "Found {} test cases{}",
            exports.len(),
            if filter.is_some() { " matching filter" } else { "" }
        );

        if exports.is_empty() {
            continue;
        }

        let file_name = format!(
            "{}.{}",
            export::safe_file_name(&suite.name),
            format.extension()
        );
        export::export_to_file(&exports, &output_dir.join(file_name), format)?;
    }

    info!("Export completed successfully");
    Ok(())
}

/// Report Cucumber JSON results against a TestRail run.
async fn run_report_results(
    service: &mut TestRailService,
    results_file: &Path,
    run_id: Option<u64>,
    close_run: bool,
) -> Result<()> {
    info!("Reporting test results to TestRail...");

    let features = report::load_cucumber_report(results_file)?;

    let run_id = runs::resolve_run_id(run_id, &runs::default_run_info_path())?;
    info!("Using TestRail run ID: {run_id}");
    service.set_run_id(run_id);

    let results = report::collect_results(&features);
    info!("Reporting {} results to TestRail...", results.len());

    let reported = report::submit_results(service, &results).await?;
    info!("Successfully reported {reported} results to TestRail");

    if close_run {
        info!("Closing TestRail run...");
        service.close_run(None).await?;
        info!("TestRail run closed successfully");
    }

    Ok(())
}

/// Check case coverage of the feature files and report the summary.
async fn run_check_coverage(
    service: &mut TestRailService,
    features_dir: &Path,
    output: &str,
    report_file: &Path,
    required_tags: &[String],
    strict: bool,
) -> Result<()> {
    info!("Checking TestRail test case coverage...");

    let summary = coverage::check_coverage(service, features_dir, required_tags).await?;

    if output == "json" {
        let content = serde_json::to_string_pretty(&summary)?;
        if let Some(parent) = report_file.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(report_file, content)?;
        info!("Coverage report written to: {}", report_file.display());
    } else {
        coverage::print_summary(&summary);
    }

    if strict && summary.percentage < 100 {
        return Err(SyncError::CoverageFailed(format!(
            "{}% of {} cases covered",
            summary.percentage, summary.total
        )));
    }

    if summary.covered == 0 && summary.total > 0 {
        warn!("No feature file maps to any TestRail case");
    }

    Ok(())
}
