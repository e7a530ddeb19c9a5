//! Data models for the log analyzer.
//!
//! This module contains the records that flow through a run: the task
//! descriptors read from the configuration file, the per-task analysis
//! results, and the report built from them.

use crate::analysis::AnalysisError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message attached to every successful analysis.
pub const SUCCESS_MESSAGE: &str = "analysis completed successfully";

/// One log entry to analyze, as listed in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Unique identifier of the entry.
    pub id: String,
    /// Path of the log file to inspect.
    pub path: String,
    /// Log type tag. Informational only.
    #[serde(rename = "type", default)]
    pub log_type: String,
}

impl LogConfig {
    #[allow(dead_code)] // Entries normally come from the log list file
    pub fn new(id: impl Into<String>, path: impl Into<String>, log_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            log_type: log_type.into(),
        }
    }
}

/// Final status of one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalysisStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "FAILED")]
    Failed,
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisStatus::Ok => write!(f, "OK"),
            AnalysisStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl AnalysisStatus {
    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            AnalysisStatus::Ok => "✅",
            AnalysisStatus::Failed => "❌",
        }
    }
}

/// Result of analyzing a single log entry.
///
/// Built only through [`AnalysisResult::success`] and
/// [`AnalysisResult::failure`], so `status` is `Failed` exactly when
/// `error_details` is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Identifier copied from the descriptor.
    pub log_id: String,
    /// Path copied from the descriptor.
    pub file_path: String,
    /// OK or FAILED.
    pub status: AnalysisStatus,
    /// Human-readable outcome message.
    pub message: String,
    /// Underlying cause, empty on success.
    #[serde(default)]
    pub error_details: String,
}

impl AnalysisResult {
    /// Creates a successful result for a descriptor.
    pub fn success(log: &LogConfig) -> Self {
        Self {
            log_id: log.id.clone(),
            file_path: log.path.clone(),
            status: AnalysisStatus::Ok,
            message: SUCCESS_MESSAGE.to_string(),
            error_details: String::new(),
        }
    }

    /// Creates a failed result carrying the error's category and detail.
    pub fn failure(log: &LogConfig, error: &AnalysisError) -> Self {
        Self {
            log_id: log.id.clone(),
            file_path: log.path.clone(),
            status: AnalysisStatus::Failed,
            message: error.message().to_string(),
            error_details: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AnalysisStatus::Ok
    }
}

/// Top-line counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of analyzed entries.
    pub total: usize,
    /// Entries with status OK.
    pub succeeded: usize,
    /// Entries with status FAILED.
    pub failed: usize,
}

impl RunSummary {
    /// Creates a summary from a list of results.
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.is_ok()).count();

        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Metadata about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Descriptor file the run was started from.
    pub config_file: String,
    /// Date and time the run finished.
    pub analysis_date: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Metadata about the run.
    pub metadata: ReportMetadata,
    /// Summary counts.
    pub summary: RunSummary,
    /// Every result of the run, one per descriptor.
    pub results: Vec<AnalysisResult>,
}

impl Report {
    /// Builds a report, deriving the summary from the results.
    pub fn new(metadata: ReportMetadata, results: Vec<AnalysisResult>) -> Self {
        Self {
            metadata,
            summary: crate::analysis::summarize(&results),
            results,
        }
    }
}
