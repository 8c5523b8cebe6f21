//! Batch mode: run every report image in a directory through the analyzer
//! and write a JSON summary next to the run's log file.

use crate::analyzer::ReportAnalyzer;
use crate::config::Config;
use crate::engines;
use crate::error::LabError;
use crate::extraction::LabTestRecord;
use anyhow::{bail, Context};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Extensions processed in batch mode (compared case-insensitively)
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tiff", "bmp"];

/// Where a batch run reads from and writes to
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// `%Y%m%d_%H%M%S` stamp shared by the report and log file names
    pub run_stamp: String,
}

/// Result for a single image
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub file: String,
    pub is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<LabTestRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub success_rate: String,
    pub total_tests_found: usize,
}

/// Whole-run report written as JSON
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub run_timestamp: String,
    pub total_files: usize,
    /// Files that yielded at least one test
    pub successful_extractions: usize,
    pub results: Vec<FileResult>,
    pub summary: BatchSummary,
}

/// Timestamp for naming a run's output files
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Name of the log file for a run
pub fn log_file_name(run_stamp: &str) -> String {
    format!("lab_results_{}.log", run_stamp)
}

/// Process the input directory and save the report
///
/// Without an OCR engine every image is recorded as failed and the report is
/// still written.
pub fn run(config: &Config, options: &BatchOptions) -> anyhow::Result<PathBuf> {
    if !options.input_dir.is_dir() {
        bail!("Directory '{}' does not exist!", options.input_dir.display());
    }

    let analyzer = engines::build_engine(config).map(ReportAnalyzer::new);
    if analyzer.is_none() {
        tracing::error!("Tesseract OCR not found; every image will be recorded as failed");
    }

    let report = process_directory(analyzer.as_ref(), &options.input_dir, &options.run_stamp)?;
    log_summary(&report);

    save_report(&report, &options.output_dir)
}

/// Image files directly inside `dir`, sorted by path
pub fn collect_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Analyze every image in `dir`; per-file failures are recorded, not fatal
pub fn process_directory(
    analyzer: Option<&ReportAnalyzer>,
    dir: &Path,
    run_stamp: &str,
) -> anyhow::Result<BatchReport> {
    let images = collect_images(dir)
        .with_context(|| format!("Failed to list images in {}", dir.display()))?;

    let mut results = Vec::with_capacity(images.len());
    let mut successful_extractions = 0;

    for path in &images {
        tracing::info!("{}", "=".repeat(80));
        tracing::info!("Processing: {}", path.display());

        let result = process_file(analyzer, path);
        match (&result.data, &result.error) {
            (Some(data), _) if !data.is_empty() => {
                successful_extractions += 1;
                tracing::info!("Found {} test results:", data.len());
                for test in data {
                    tracing::info!(
                        "  - {}: {} {} (Range: {})",
                        test.test_name,
                        test.test_value,
                        test.test_unit,
                        test.bio_reference_range
                    );
                }
            }
            (Some(_), _) => tracing::warn!("No lab data found in {}", path.display()),
            (None, error) => tracing::error!(
                "Failed to process {}: {}",
                path.display(),
                error.as_deref().unwrap_or("unknown error")
            ),
        }

        results.push(result);
    }

    let total_files = results.len();
    let success_rate = if total_files > 0 {
        successful_extractions as f64 / total_files as f64 * 100.0
    } else {
        0.0
    };
    let total_tests_found = results
        .iter()
        .filter_map(|r| r.data.as_ref())
        .map(Vec::len)
        .sum();

    Ok(BatchReport {
        run_timestamp: run_stamp.to_string(),
        total_files,
        successful_extractions,
        results,
        summary: BatchSummary {
            success_rate: format!("{:.2}%", success_rate),
            total_tests_found,
        },
    })
}

fn process_file(analyzer: Option<&ReportAnalyzer>, path: &Path) -> FileResult {
    let outcome = analyzer
        .ok_or(LabError::EngineUnavailable)
        .and_then(|analyzer| analyzer.analyze_path(path));
    let timestamp = chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string();

    match outcome {
        Ok(analysis) => FileResult {
            file: path.display().to_string(),
            is_success: true,
            data: Some(analysis.records),
            error: None,
            timestamp,
        },
        Err(e) => {
            tracing::error!("Error processing {}: {}", path.display(), e);
            FileResult {
                file: path.display().to_string(),
                is_success: false,
                data: None,
                error: Some(e.to_string()),
                timestamp,
            }
        }
    }
}

fn log_summary(report: &BatchReport) {
    tracing::info!("{}", "=".repeat(80));
    tracing::info!("Processing complete!");
    tracing::info!("Total files processed: {}", report.total_files);
    tracing::info!("Successful extractions: {}", report.successful_extractions);
    tracing::info!("Success rate: {}", report.summary.success_rate);
    tracing::info!("Total tests found: {}", report.summary.total_tests_found);
}

/// Write the report as pretty JSON to `lab_results_<stamp>.json`
pub fn save_report(report: &BatchReport, output_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let path = output_dir.join(format!("lab_results_{}.json", report.run_timestamp));
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Results saved to {}", path.display());
    Ok(path)
}
