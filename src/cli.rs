//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// log_analyzer - concurrent log file analyzer
///
/// Analyze every log file listed in a configuration file in parallel
/// and print or export a report of the results.
///
/// Examples:
///   log_analyzer analyze --config logs.json
///   log_analyzer analyze -c logs.json -o results.json -v
///   log_analyzer analyze -c logs.json -o report.md --format markdown
///   log_analyzer init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze the log files listed in a configuration file
    Analyze(AnalyzeArgs),

    /// Generate a default .log_analyzer.toml settings file
    InitConfig,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Log list: JSON array of {id, path, type} (or TOML with [[logs]])
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Export the results to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Export format (json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to settings file
    ///
    /// If not specified, looks for .log_analyzer.toml in the current directory
    #[arg(long, value_name = "FILE", env = "LOG_ANALYZER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Maximum number of concurrent analyses (0 = unbounded)
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Per-log timeout in milliseconds (0 = none)
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Extra attempts for log files that are not found
    #[arg(long, value_name = "COUNT")]
    pub retries: Option<u32>,

    /// Probability (0.0 - 1.0) of a simulated parse failure
    #[arg(long, value_name = "RATE")]
    pub failure_rate: Option<f64>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Exit with code 2 when any log fails analysis
    #[arg(long)]
    pub strict: bool,
}

/// Output format for the exported report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON array of results (default)
    #[default]
    Json,
    /// Markdown report
    Markdown,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Analyze(analyze) => analyze.validate(),
            Command::InitConfig => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl AnalyzeArgs {
    fn validate(&self) -> Result<(), String> {
        if !self.config.exists() {
            return Err(format!(
                "Configuration file does not exist: {}",
                self.config.display()
            ));
        }

        if let Some(rate) = self.failure_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err("Failure rate must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(format!("Output path is a directory: {}", output.display()));
            }
        }

        Ok(())
    }
}
