//! log_analyzer - concurrent log file analyzer
//!
//! A CLI tool that analyzes every log file listed in a configuration
//! file in parallel and reports the outcome of each analysis.
//!
//! Exit codes:
//!   0 - Success (including runs where individual logs failed)
//!   1 - Runtime error (unreadable configuration, dispatch or export failure)
//!   2 - At least one log failed and --strict was given
//!   130 - Interrupted twice (the first Ctrl-C only cancels pending analyses)

mod analysis;
mod cli;
mod config;
mod models;
mod orchestrator;
mod report;

use analysis::SimulatedAnalyzer;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{AnalyzeArgs, Args, Command};
use config::Config;
use models::{Report, ReportMetadata};
use orchestrator::{Orchestrator, RunOptions};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let analyze = match args.command {
        Command::InitConfig => return handle_init_config(),
        Command::Analyze(ref analyze) => analyze.clone(),
    };

    // Settings are loaded before logging so `general.verbose` can apply
    let mut config = match load_config(&analyze) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&analyze, args.verbose);
    if args.quiet {
        config.orchestrator.show_progress = false;
    }

    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    init_logging(level)?;

    info!("log_analyzer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_analyze(&analyze, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `init-config`: generate a default .log_analyzer.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::DEFAULT_SETTINGS_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_SETTINGS_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_SETTINGS_FILE))?;

    println!(
        "✅ Created {} with default settings.",
        config::DEFAULT_SETTINGS_FILE
    );
    println!("   Edit it to tune concurrency, timeouts, retries and the simulated analysis.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` takes precedence over the CLI level.
fn init_logging(level: tracing::Level) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load settings from the given file, the default location, or defaults.
fn load_config(args: &AnalyzeArgs) -> Result<Config> {
    if let Some(ref settings_path) = args.settings {
        return Config::load(settings_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}

/// Turn interrupts into run cancellation.
///
/// The first interrupt sets the cancel flag. Returns `true` once a second
/// interrupt arrives, `false` if the signal source fails.
async fn forward_interrupts<F, Fut>(mut next_interrupt: F, cancel_tx: watch::Sender<bool>) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("Interrupt received, waiting for running analyses to finish (press Ctrl-C again to abort)");
    let _ = cancel_tx.send(true);

    if next_interrupt().await.is_err() {
        return false;
    }
    warn!("Second interrupt received, aborting");
    true
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_analyze(args: &AnalyzeArgs, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    println!("📋 Loading configuration: {}", args.config.display());
    let logs = config::load_logs(&args.config)?;

    println!(
        "📊 Starting parallel analysis of {} log file(s)...\n",
        logs.len()
    );

    let analyzer = Arc::new(SimulatedAnalyzer::from(&config.analysis));
    let orchestrator = Orchestrator::new(RunOptions::from(&config.orchestrator), analyzer);

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if forward_interrupts(tokio::signal::ctrl_c, cancel_tx).await {
            eprintln!("\n⛔ Interrupted twice, aborting.");
            std::process::exit(130);
        }
    });

    let results = orchestrator.run_with_cancel(&logs, cancel_rx).await?;

    let metadata = ReportMetadata {
        config_file: args.config.display().to_string(),
        analysis_date: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report::new(metadata, results);

    print!("{}", report::render_console(&report.results, &report.summary));

    if let Some(ref output) = config.general.output {
        let path = Path::new(output);
        println!("\n💾 Exporting results to: {}", path.display());
        report::write_report(&report, path, config.general.format)?;
        println!("✅ Results exported to {}", path.display());
    }

    info!(
        "Run finished in {:.2}s: {}",
        report.metadata.duration_seconds,
        analysis::generate_summary_text(&report.summary)
    );

    if args.strict && !report.summary.all_succeeded() {
        eprintln!(
            "\n⛔ {} log(s) failed analysis. Failing (exit code 2).",
            report.summary.failed
        );
        return Ok(2);
    }

    Ok(0)
}
