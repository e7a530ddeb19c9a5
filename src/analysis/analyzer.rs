//! Analysis of a single log entry.
//!
//! An analysis runs in two steps: the file is checked for accessibility,
//! then its content is handed to a [`ContentAnalyzer`]. The analyzer is a
//! trait object so tests can swap in deterministic behaviour and a real
//! parser can replace the simulated one without touching the orchestrator.

use crate::analysis::AnalysisError;
use crate::config::AnalysisConfig;
use crate::models::{AnalysisResult, LogConfig};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Inspects the content of an accessible log file.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    /// Analyze the file behind `log`. Only called once the path is known
    /// to be a readable regular file.
    async fn analyze(&self, log: &LogConfig) -> Result<(), AnalysisError>;
}

/// Stand-in analyzer: waits a random duration, then fails at a fixed rate.
#[derive(Debug, Clone)]
pub struct SimulatedAnalyzer {
    min_delay: Duration,
    max_delay: Duration,
    failure_rate: f64,
}

impl SimulatedAnalyzer {
    pub fn new(min_delay: Duration, max_delay: Duration, failure_rate: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    /// Pick a delay uniformly in `[min_delay, max_delay)`.
    fn pick_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(fastrand::u64(min..max))
    }
}

impl From<&AnalysisConfig> for SimulatedAnalyzer {
    fn from(config: &AnalysisConfig) -> Self {
        Self::new(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.failure_rate,
        )
    }
}

#[async_trait]
impl ContentAnalyzer for SimulatedAnalyzer {
    async fn analyze(&self, log: &LogConfig) -> Result<(), AnalysisError> {
        let delay = self.pick_delay();
        let delay_ms = delay.as_millis() as u64;
        debug!(log_id = %log.id, delay_ms, "Simulating analysis");
        tokio::time::sleep(delay).await;

        if fastrand::f64() < self.failure_rate {
            return Err(AnalysisError::Parse {
                log_id: log.id.clone(),
                reason: "invalid log format detected".to_string(),
            });
        }

        Ok(())
    }
}

/// Check that `path` exists, is not a directory and can be opened.
///
/// Every failure maps to [`AnalysisError::FileNotFound`]; a directory is
/// reported the same way as a missing file.
pub async fn check_file_access(path: &str) -> Result<(), AnalysisError> {
    let not_found = |cause: String| AnalysisError::FileNotFound {
        path: path.to_string(),
        cause,
    };

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| not_found(e.to_string()))?;

    if metadata.is_dir() {
        return Err(not_found("path points to a directory".to_string()));
    }

    tokio::fs::File::open(path)
        .await
        .map_err(|e| not_found(e.to_string()))?;

    Ok(())
}

/// Run both analysis steps, returning the classified error on failure.
pub async fn try_analyze_log(
    log: &LogConfig,
    analyzer: &dyn ContentAnalyzer,
) -> Result<(), AnalysisError> {
    check_file_access(&log.path).await?;
    analyzer.analyze(log).await
}

/// Analyze one log entry. Never fails: errors become a FAILED result.
#[allow(dead_code)] // Single-attempt entry point; the orchestrator adds retries on top
pub async fn analyze_log(log: &LogConfig, analyzer: &dyn ContentAnalyzer) -> AnalysisResult {
    match try_analyze_log(log, analyzer).await {
        Ok(()) => AnalysisResult::success(log),
        Err(e) => AnalysisResult::failure(log, &e),
    }
}
