//! Failure taxonomy for a single log analysis.

use std::time::Duration;
use thiserror::Error;

/// Why the analysis of one log entry failed.
///
/// Every variant is terminal for its own entry only; the orchestrator turns
/// it into a FAILED result and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The path is missing, is a directory, or cannot be opened.
    #[error("file not found: {path}: {cause}")]
    FileNotFound { path: String, cause: String },

    /// The content was rejected by the analyzer.
    #[error("parse error for log '{log_id}': {reason}")]
    Parse { log_id: String, reason: String },

    /// The analysis did not finish within the per-task limit.
    #[error("analysis of log '{log_id}' exceeded {}ms", limit.as_millis())]
    Timeout { log_id: String, limit: Duration },

    /// The run was cancelled before this entry's analysis started.
    #[error("run cancelled before analysis of log '{log_id}' started")]
    Cancelled { log_id: String },

    /// The analysis task terminated abnormally.
    #[error("analysis of log '{log_id}' aborted: {reason}")]
    Aborted { log_id: String, reason: String },
}

impl AnalysisError {
    /// Human-readable category shown as the result message.
    pub fn message(&self) -> &'static str {
        match self {
            AnalysisError::FileNotFound { .. } => "file not found",
            AnalysisError::Parse { .. } => "parsing error",
            AnalysisError::Timeout { .. } => "analysis timed out",
            AnalysisError::Cancelled { .. } => "analysis cancelled",
            AnalysisError::Aborted { .. } => "analysis aborted",
        }
    }

    /// Only missing files are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AnalysisError::FileNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_cause() {
        let err = AnalysisError::FileNotFound {
            path: "/tmp/missing.log".to_string(),
            cause: "No such file or directory (os error 2)".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("/tmp/missing.log"));
        assert!(text.contains("os error 2"));
        assert_eq!(err.message(), "file not found");
    }

    #[test]
    fn test_timeout_display() {
        let err = AnalysisError::Timeout {
            log_id: "api".to_string(),
            limit: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "analysis of log 'api' exceeded 250ms");
        assert_eq!(err.message(), "analysis timed out");
    }

    #[test]
    fn test_cancelled_display() {
        let err = AnalysisError::Cancelled {
            log_id: "queued".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "run cancelled before analysis of log 'queued' started"
        );
        assert_eq!(err.message(), "analysis cancelled");
    }

    #[test]
    fn test_only_file_not_found_is_retryable() {
        let missing = AnalysisError::FileNotFound {
            path: "x".to_string(),
            cause: "gone".to_string(),
        };
        let parse = AnalysisError::Parse {
            log_id: "x".to_string(),
            reason: "bad".to_string(),
        };
        assert!(missing.is_retryable());
        assert!(!parse.is_retryable());
        assert!(!AnalysisError::Cancelled {
            log_id: "x".to_string()
        }
        .is_retryable());
    }
}
