//! Report generation.
//!
//! Renders the results of a run for the terminal, as a Markdown document,
//! or as an indented JSON array that can be read back with
//! [`parse_json_results`].

use crate::analysis::{failures_by_message, generate_summary_text};
use crate::cli::OutputFormat;
use crate::models::{AnalysisResult, Report, ReportMetadata, RunSummary};
use anyhow::{Context, Result};
use std::path::Path;

/// Render every result as a block for the terminal.
pub fn render_console(results: &[AnalysisResult], summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} Analysis complete: {}/{} log(s) processed successfully\n\n",
        if summary.all_succeeded() { "✅" } else { "⚠️ " },
        summary.succeeded,
        summary.total
    ));

    output.push_str("📊 ANALYSIS RESULTS:\n");
    output.push_str(&"=".repeat(80));
    output.push('\n');

    for result in results {
        output.push_str(&render_result_block(result));
    }

    output
}

/// Render a single result block.
fn render_result_block(result: &AnalysisResult) -> String {
    let mut block = String::new();

    block.push_str(&format!("\n🆔 ID: {}\n", result.log_id));
    block.push_str(&format!("📄 Path: {}\n", result.file_path));
    block.push_str(&format!("{} Status: {}\n", result.status.emoji(), result.status));
    block.push_str(&format!("💬 Message: {}\n", result.message));
    if !result.is_ok() && !result.error_details.is_empty() {
        block.push_str(&format!("🔍 Error details: {}\n", result.error_details));
    }
    block.push_str(&"-".repeat(50));
    block.push('\n');

    block
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Log Analysis Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.summary, &report.results));
    output.push_str(&generate_results_section(&report.results));

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Configuration:** `{}`\n", metadata.config_file));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_summary_section(summary: &RunSummary, results: &[AnalysisResult]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!("{}\n\n", generate_summary_text(summary)));
    section.push_str("| ✅ OK | ❌ Failed | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | **{}** |\n\n",
        summary.succeeded, summary.failed, summary.total
    ));

    let failures = failures_by_message(results);
    if !failures.is_empty() {
        section.push_str("### Failures by Category\n\n");
        section.push_str("| Category | Count |\n");
        section.push_str("|:---|:---:|\n");
        for (message, count) in failures {
            section.push_str(&format!("| {} | {} |\n", message, count));
        }
        section.push('\n');
    }

    section
}

fn generate_results_section(results: &[AnalysisResult]) -> String {
    let mut section = String::new();

    section.push_str("## Results\n\n");

    if results.is_empty() {
        section.push_str("No logs were configured.\n\n");
        return section;
    }

    for result in results {
        section.push_str(&format!(
            "### {} `{}`\n\n",
            result.status.emoji(),
            result.log_id
        ));
        section.push_str(&format!("- **Path:** `{}`\n", result.file_path));
        section.push_str(&format!("- **Status:** {}\n", result.status));
        section.push_str(&format!("- **Message:** {}\n", result.message));
        if !result.error_details.is_empty() {
            section.push_str(&format!("- **Details:** {}\n", result.error_details));
        }
        section.push('\n');
    }

    section
}

/// Serialize results as an indented JSON array.
pub fn generate_json_results(results: &[AnalysisResult]) -> Result<String> {
    serde_json::to_string_pretty(results).map_err(Into::into)
}

/// Parse results previously written by [`generate_json_results`].
#[allow(dead_code)] // Reader counterpart of the JSON export
pub fn parse_json_results(content: &str) -> Result<Vec<AnalysisResult>> {
    serde_json::from_str(content).context("Failed to parse exported results")
}

/// Write the report to `path` in the requested format.
pub fn write_report(report: &Report, path: &Path, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Json => generate_json_results(&report.results)?,
        OutputFormat::Markdown => generate_markdown_report(report),
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
