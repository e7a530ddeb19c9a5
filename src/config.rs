//! Configuration file handling.
//!
//! Two files feed a run: the log list (JSON array of `{id, path, type}`, or
//! a TOML file with `[[logs]]` tables) and the optional settings file
//! `.log_analyzer.toml`.

use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::models::LogConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default settings file name, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = ".log_analyzer.toml";

/// Root settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Simulated analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Orchestrator settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Export path for the report. No export when unset.
    #[serde(default)]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Export format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Settings of the simulated content analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Lower bound of the simulated delay, inclusive.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the simulated delay, exclusive.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Probability that an analysis reports a parse error.
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            failure_rate: default_failure_rate(),
        }
    }
}

fn default_min_delay() -> u64 {
    50
}

fn default_max_delay() -> u64 {
    200
}

fn default_failure_rate() -> f64 {
    0.1
}

/// Concurrency and hardening settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum analyses running at once. 0 means unbounded.
    #[serde(default)]
    pub max_concurrency: usize,

    /// Per-task timeout in milliseconds. 0 disables it.
    #[serde(default)]
    pub task_timeout_ms: u64,

    /// Extra attempts for files that were not found.
    #[serde(default)]
    pub retries: u32,

    /// Pause between attempts.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Show a progress bar while the run is active.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 0,
            task_timeout_ms: 0,
            retries: 0,
            retry_delay_ms: default_retry_delay(),
            show_progress: true,
        }
    }
}

fn default_retry_delay() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

/// TOML form of the log list.
#[derive(Debug, Deserialize)]
struct LogList {
    #[serde(default)]
    logs: Vec<LogConfig>,
}

impl Config {
    /// Load settings from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load settings from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_SETTINGS_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge these settings with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &AnalyzeArgs, verbose: bool) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.to_string_lossy().to_string());
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if verbose {
            self.general.verbose = true;
        }

        if let Some(rate) = args.failure_rate {
            self.analysis.failure_rate = rate;
        }

        if let Some(concurrency) = args.concurrency {
            self.orchestrator.max_concurrency = concurrency;
        }
        if let Some(timeout) = args.timeout {
            self.orchestrator.task_timeout_ms = timeout;
        }
        if let Some(retries) = args.retries {
            self.orchestrator.retries = retries;
        }
        if args.no_progress {
            self.orchestrator.show_progress = false;
        }
    }

    /// Generate a default settings file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Load the list of logs to analyze.
///
/// Files ending in `.toml` are read as `[[logs]]` tables, anything else as a
/// JSON array. Identifiers must be unique.
pub fn load_logs(path: &Path) -> Result<Vec<LogConfig>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log list: {}", path.display()))?;

    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    let logs = if is_toml {
        toml::from_str::<LogList>(&content)
            .with_context(|| format!("Failed to parse log list: {}", path.display()))?
            .logs
    } else {
        serde_json::from_str::<Vec<LogConfig>>(&content)
            .with_context(|| format!("Failed to parse log list: {}", path.display()))?
    };

    validate_logs(&logs)?;
    Ok(logs)
}

/// Reject empty or duplicate identifiers.
///
/// Paths are not checked here: an unusable path is reported as that entry's
/// own "file not found" result.
pub fn validate_logs(logs: &[LogConfig]) -> Result<()> {
    let mut seen = HashSet::new();

    for log in logs {
        if log.id.trim().is_empty() {
            bail!("Log entry with path '{}' has an empty id", log.path);
        }
        if !seen.insert(log.id.as_str()) {
            bail!("Duplicate log id: {}", log.id);
        }
    }

    Ok(())
}
