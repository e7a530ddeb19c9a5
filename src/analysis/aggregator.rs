//! Result aggregation and statistics.
//!
//! This module provides pure helpers over a completed set of results:
//! summary counts and failure breakdowns for reports.

use crate::models::{AnalysisResult, RunSummary};
use std::collections::BTreeMap;

/// Compute the summary for a completed run.
pub fn summarize(results: &[AnalysisResult]) -> RunSummary {
    RunSummary::from_results(results)
}

/// Failed results only, in their original order.
pub fn failed_results(results: &[AnalysisResult]) -> Vec<&AnalysisResult> {
    results.iter().filter(|r| !r.is_ok()).collect()
}

/// Count failures per category message. Ordered by message for stable output.
pub fn failures_by_message(results: &[AnalysisResult]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for result in failed_results(results) {
        *counts.entry(result.message.clone()).or_default() += 1;
    }

    counts
}

/// Generate a text summary of run statistics.
pub fn generate_summary_text(summary: &RunSummary) -> String {
    format!(
        "{}/{} log(s) analyzed successfully, {} failed",
        summary.succeeded, summary.total, summary.failed
    )
}
