//! Concurrent execution of a batch of log analyses.
//!
//! Every log entry gets its own spawned task. The handles are joined with
//! `join_all`, so a run returns only once every entry has produced exactly
//! one result. Results come back in input order.
//!
//! ```text
//! logs ──▶ dispatch ──▶ [task per log] ──▶ join_all ──▶ Vec<AnalysisResult>
//!              │              │
//!          cancel?      permit / timeout / retry
//! ```

use crate::analysis::{try_analyze_log, AnalysisError, ContentAnalyzer};
use crate::config::OrchestratorConfig;
use crate::models::{AnalysisResult, LogConfig};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Run-level failure. Per-log failures are results, never this.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("failed to dispatch analysis of log '{log_id}': {reason}")]
    Dispatch { log_id: String, reason: String },
}

/// Execution options for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Maximum analyses running at once. `None` means unbounded.
    pub max_concurrency: Option<usize>,
    /// Limit for a single analysis attempt.
    pub task_timeout: Option<Duration>,
    /// Extra attempts for files that were not found.
    pub retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            task_timeout: None,
            retries: 0,
            retry_delay: Duration::from_millis(100),
            show_progress: false,
        }
    }
}

impl From<&OrchestratorConfig> for RunOptions {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            max_concurrency: (config.max_concurrency > 0).then_some(config.max_concurrency),
            task_timeout: (config.task_timeout_ms > 0)
                .then(|| Duration::from_millis(config.task_timeout_ms)),
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            show_progress: config.show_progress,
        }
    }
}

/// Everything a spawned task needs, owned.
struct TaskContext {
    log: LogConfig,
    index: usize,
    total: usize,
    analyzer: Arc<dyn ContentAnalyzer>,
    options: RunOptions,
    semaphore: Option<Arc<Semaphore>>,
    cancel: watch::Receiver<bool>,
    progress: ProgressBar,
}

enum Slot {
    Spawned(JoinHandle<AnalysisResult>),
    Settled(AnalysisResult),
}

/// Dispatches one analysis task per log entry and collects the results.
pub struct Orchestrator {
    options: RunOptions,
    analyzer: Arc<dyn ContentAnalyzer>,
}

impl Orchestrator {
    pub fn new(options: RunOptions, analyzer: Arc<dyn ContentAnalyzer>) -> Self {
        Self { options, analyzer }
    }

    /// Analyze all logs. Returns one result per log, in input order.
    #[allow(dead_code)] // Convenience wrapper without a cancel signal
    pub async fn run(&self, logs: &[LogConfig]) -> Result<Vec<AnalysisResult>, OrchestratorError> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.run_with_cancel(logs, cancel_rx).await
    }

    /// Like [`Orchestrator::run`], stopping early when `cancel` turns true.
    ///
    /// Logs whose analysis has not started by then get a cancelled result.
    /// Analyses already running are waited for.
    pub async fn run_with_cancel(
        &self,
        logs: &[LogConfig],
        cancel: watch::Receiver<bool>,
    ) -> Result<Vec<AnalysisResult>, OrchestratorError> {
        let total = logs.len();
        info!("Starting analysis of {} log(s)", total);

        let semaphore = self
            .options
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.clamp(1, Semaphore::MAX_PERMITS))));
        let progress = self.progress_bar(total);

        let mut slots = Vec::with_capacity(total);
        for (index, log) in logs.iter().enumerate() {
            let is_cancelled = *cancel.borrow();
            if is_cancelled {
                slots.push(Slot::Settled(cancelled(log)));
                progress.inc(1);
                continue;
            }

            let runtime = Handle::try_current().map_err(|e| OrchestratorError::Dispatch {
                log_id: log.id.clone(),
                reason: e.to_string(),
            })?;

            let ctx = TaskContext {
                log: log.clone(),
                index,
                total,
                analyzer: Arc::clone(&self.analyzer),
                options: self.options.clone(),
                semaphore: semaphore.clone(),
                cancel: cancel.clone(),
                progress: progress.clone(),
            };
            slots.push(Slot::Spawned(runtime.spawn(run_task(ctx))));
        }

        let pending = slots.into_iter().zip(logs).map(|(slot, log)| async move {
            match slot {
                Slot::Settled(result) => result,
                Slot::Spawned(handle) => match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(log_id = %log.id, "Analysis task ended abnormally: {}", e);
                        AnalysisResult::failure(
                            log,
                            &AnalysisError::Aborted {
                                log_id: log.id.clone(),
                                reason: e.to_string(),
                            },
                        )
                    }
                },
            }
        });

        let results = join_all(pending).await;
        progress.finish_and_clear();

        debug_assert_eq!(results.len(), total);
        info!("Finished analysis of {} log(s)", results.len());
        Ok(results)
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} logs")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb
    }
}

/// Body of one spawned analysis task.
async fn run_task(mut ctx: TaskContext) -> AnalysisResult {
    let result = match acquire_slot(&mut ctx).await {
        Ok(_permit) => {
            debug!(
                log_id = %ctx.log.id,
                "[{}/{}] 🚀 Starting analysis of {} ({})",
                ctx.index + 1,
                ctx.total,
                ctx.log.id,
                ctx.log.path
            );
            let result = analyze_with_retries(&ctx).await;
            debug!(
                log_id = %ctx.log.id,
                "[{}/{}] {} Finished: {}",
                ctx.index + 1,
                ctx.total,
                result.status.emoji(),
                ctx.log.id
            );
            result
        }
        Err(result) => result,
    };

    ctx.progress.inc(1);
    result
}

/// Wait for a concurrency permit unless the run is cancelled first.
///
/// `Err` carries the result to report when the analysis must not start.
async fn acquire_slot(
    ctx: &mut TaskContext,
) -> Result<Option<OwnedSemaphorePermit>, AnalysisResult> {
    let permit = match ctx.semaphore.clone() {
        Some(semaphore) => tokio::select! {
            biased;
            _ = wait_cancelled(&mut ctx.cancel) => return Err(cancelled(&ctx.log)),
            permit = semaphore.acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(e) => {
                    return Err(AnalysisResult::failure(
                        &ctx.log,
                        &AnalysisError::Aborted {
                            log_id: ctx.log.id.clone(),
                            reason: e.to_string(),
                        },
                    ))
                }
            },
        },
        None => None,
    };

    let is_cancelled = *ctx.cancel.borrow();
    if is_cancelled {
        return Err(cancelled(&ctx.log));
    }

    Ok(permit)
}

/// Resolves once the cancel flag is set. Never resolves if the sender is gone.
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    let sender_gone = cancel.wait_for(|flag| *flag).await.is_err();
    if sender_gone {
        futures::future::pending::<()>().await;
    }
}

async fn analyze_with_retries(ctx: &TaskContext) -> AnalysisResult {
    let mut attempt = 0;

    loop {
        match analyze_once(ctx).await {
            Ok(()) => return AnalysisResult::success(&ctx.log),
            Err(e) if e.is_retryable() && attempt < ctx.options.retries => {
                attempt += 1;
                warn!(
                    log_id = %ctx.log.id,
                    "Attempt {}/{} failed: {}",
                    attempt,
                    ctx.options.retries + 1,
                    e
                );
                tokio::time::sleep(ctx.options.retry_delay).await;
            }
            Err(e) => return AnalysisResult::failure(&ctx.log, &e),
        }
    }
}

async fn analyze_once(ctx: &TaskContext) -> Result<(), AnalysisError> {
    let analysis = try_analyze_log(&ctx.log, ctx.analyzer.as_ref());

    match ctx.options.task_timeout {
        Some(limit) => tokio::time::timeout(limit, analysis)
            .await
            .unwrap_or_else(|_| {
                Err(AnalysisError::Timeout {
                    log_id: ctx.log.id.clone(),
                    limit,
                })
            }),
        None => analysis.await,
    }
}

fn cancelled(log: &LogConfig) -> AnalysisResult {
    AnalysisResult::failure(
        log,
        &AnalysisError::Cancelled {
            log_id: log.id.clone(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisStatus;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tempfile::TempDir;

    /// Succeeds after a short random pause.
    struct JitterOk;

    #[async_trait]
    impl ContentAnalyzer for JitterOk {
        async fn analyze(&self, _log: &LogConfig) -> Result<(), AnalysisError> {
            tokio::time::sleep(Duration::from_millis(fastrand::u64(0..3))).await;
            Ok(())
        }
    }

    /// Sleeps a fixed time, tracking how many analyses overlap.
    struct Sleeper {
        delay: Duration,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Sleeper {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentAnalyzer for Sleeper {
        async fn analyze(&self, _log: &LogConfig) -> Result<(), AnalysisError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Rejects one id, panics on another, accepts the rest.
    struct Picky;

    #[async_trait]
    impl ContentAnalyzer for Picky {
        async fn analyze(&self, log: &LogConfig) -> Result<(), AnalysisError> {
            match log.id.as_str() {
                "bad" => Err(AnalysisError::Parse {
                    log_id: log.id.clone(),
                    reason: "invalid log format detected".to_string(),
                }),
                "boom" => panic!("analyzer blew up"),
                _ => Ok(()),
            }
        }
    }

    fn make_logs(dir: &TempDir, ids: &[&str]) -> Vec<LogConfig> {
        ids.iter()
            .map(|id| {
                let path = dir.path().join(format!("{}.log", id));
                std::fs::write(&path, "INFO ready\n").unwrap();
                LogConfig::new(*id, path.to_string_lossy(), "app")
            })
            .collect()
    }

    fn orchestrator(options: RunOptions, analyzer: impl ContentAnalyzer + 'static) -> Orchestrator {
        Orchestrator::new(options, Arc::new(analyzer))
    }

    #[tokio::test]
    async fn test_empty_input() {
        let orch = orchestrator(RunOptions::default(), JitterOk);
        let results = tokio_test::assert_ok!(orch.run(&[]).await);
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_existing_and_missing() {
        let dir = TempDir::new().unwrap();
        let mut logs = make_logs(&dir, &["a"]);
        logs.push(LogConfig::new(
            "b",
            dir.path().join("missing.log").to_string_lossy(),
            "app",
        ));

        let results = orchestrator(RunOptions::default(), JitterOk)
            .run(&logs)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].log_id, "a");
        assert_eq!(results[0].status, AnalysisStatus::Ok);
        assert!(results[0].error_details.is_empty());

        assert_eq!(results[1].log_id, "b");
        assert_eq!(results[1].status, AnalysisStatus::Failed);
        assert_eq!(results[1].message, "file not found");
        assert!(!results[1].error_details.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_hundred_logs_never_lost_or_duplicated() {
        let dir = TempDir::new().unwrap();
        let ids: Vec<String> = (0..100).map(|i| format!("log-{:03}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let logs = make_logs(&dir, &id_refs);
        let orch = orchestrator(RunOptions::default(), JitterOk);

        for _ in 0..20 {
            let results = orch.run(&logs).await.unwrap();
            assert_eq!(results.len(), 100);

            let seen: HashSet<_> = results
                .iter()
                .map(|r| (r.log_id.clone(), r.file_path.clone()))
                .collect();
            let expected: HashSet<_> = logs
                .iter()
                .map(|l| (l.id.clone(), l.path.clone()))
                .collect();
            assert_eq!(seen, expected);
            assert!(results.iter().all(|r| r.is_ok()));
        }
    }

    #[tokio::test]
    async fn test_failures_do_not_affect_siblings() {
        let dir = TempDir::new().unwrap();
        let logs = make_logs(&dir, &["one", "bad", "boom", "two"]);

        let results = orchestrator(RunOptions::default(), Picky)
            .run(&logs)
            .await
            .unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.log_id.as_str()).collect();
        assert_eq!(ids, vec!["one", "bad", "boom", "two"]);
        assert!(results[0].is_ok());
        assert_eq!(results[1].message, "parsing error");
        assert_eq!(results[2].message, "analysis aborted");
        assert!(!results[2].error_details.is_empty());
        assert!(results[3].is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_runs_concurrently() {
        let dir = TempDir::new().unwrap();
        let ids: Vec<String> = (0..20).map(|i| format!("slow-{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let logs = make_logs(&dir, &id_refs);

        let start = Instant::now();
        let results = orchestrator(RunOptions::default(), Sleeper::new(Duration::from_millis(100)))
            .run(&logs)
            .await
            .unwrap();

        assert_eq!(results.len(), 20);
        // Sequential execution would need two seconds.
        assert!(start.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_limit() {
        let dir = TempDir::new().unwrap();
        let ids: Vec<String> = (0..12).map(|i| format!("bounded-{}", i)).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let logs = make_logs(&dir, &id_refs);

        let analyzer = Arc::new(Sleeper::new(Duration::from_millis(20)));
        let options = RunOptions {
            max_concurrency: Some(3),
            ..RunOptions::default()
        };
        let orch = Orchestrator::new(options, analyzer.clone());

        let results = orch.run(&logs).await.unwrap();
        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(analyzer.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_huge_concurrency_limit_is_clamped() {
        let dir = TempDir::new().unwrap();
        let logs = make_logs(&dir, &["wide", "open"]);

        for limit in [usize::MAX / 2, usize::MAX] {
            let options = RunOptions {
                max_concurrency: Some(limit),
                ..RunOptions::default()
            };
            let results = orchestrator(options, JitterOk).run(&logs).await.unwrap();
            assert_eq!(results.len(), 2);
            assert!(results.iter().all(|r| r.is_ok()));
        }
    }

    #[tokio::test]
    async fn test_empty_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut logs = make_logs(&dir, &["present"]);
        logs.push(LogConfig::new("blank", "", "app"));

        let results = orchestrator(RunOptions::default(), JitterOk)
            .run(&logs)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].log_id, "blank");
        assert_eq!(results[1].status, AnalysisStatus::Failed);
        assert_eq!(results[1].message, "file not found");
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let dir = TempDir::new().unwrap();
        let logs = make_logs(&dir, &["stuck"]);
        let options = RunOptions {
            task_timeout: Some(Duration::from_millis(20)),
            ..RunOptions::default()
        };

        let results = orchestrator(options, Sleeper::new(Duration::from_secs(2)))
            .run(&logs)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, AnalysisStatus::Failed);
        assert_eq!(results[0].message, "analysis timed out");
        assert!(results[0].error_details.contains("20ms"));
    }

    #[tokio::test]
    async fn test_retry_finds_late_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.log");
        let logs = vec![LogConfig::new("late", path.to_string_lossy(), "app")];

        let writer = tokio::spawn({
            let path = path.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                std::fs::write(path, "INFO late\n").unwrap();
            }
        });

        let options = RunOptions {
            retries: 10,
            retry_delay: Duration::from_millis(25),
            ..RunOptions::default()
        };
        let results = orchestrator(options, JitterOk).run(&logs).await.unwrap();
        writer.await.unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let dir = TempDir::new().unwrap();
        let logs = vec![LogConfig::new(
            "never",
            dir.path().join("never.log").to_string_lossy(),
            "app",
        )];
        let options = RunOptions {
            retries: 2,
            retry_delay: Duration::from_millis(1),
            ..RunOptions::default()
        };

        let results = orchestrator(options, JitterOk).run(&logs).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "file not found");
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        let logs = make_logs(&dir, &["x", "y", "z"]);
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let results = orchestrator(RunOptions::default(), JitterOk)
            .run_with_cancel(&logs, rx)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.message == "analysis cancelled"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_waits_for_started_tasks() {
        let dir = TempDir::new().unwrap();
        let logs = make_logs(&dir, &["first", "second", "third", "fourth"]);
        let options = RunOptions {
            max_concurrency: Some(1),
            ..RunOptions::default()
        };
        let orch = orchestrator(options, Sleeper::new(Duration::from_millis(150)));
        let (tx, rx) = watch::channel(false);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            tx.send(true).unwrap();
            tx
        });

        let results = orch.run_with_cancel(&logs, rx).await.unwrap();
        let _tx = canceller.await.unwrap();

        assert_eq!(results.len(), 4);
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let cancelled = results
            .iter()
            .filter(|r| r.message == "analysis cancelled")
            .count();
        assert_eq!(ok, 1);
        assert_eq!(cancelled, 3);
    }

    #[test]
    fn test_dispatch_without_runtime_fails() {
        let dir = TempDir::new().unwrap();
        let logs = make_logs(&dir, &["orphan"]);
        let orch = orchestrator(RunOptions::default(), JitterOk);

        let err = futures::executor::block_on(orch.run(&logs)).unwrap_err();
        assert!(matches!(err, OrchestratorError::Dispatch { ref log_id, .. } if log_id == "orphan"));

        let empty = futures::executor::block_on(orch.run(&[])).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_run_options_from_config() {
        let config = OrchestratorConfig {
            max_concurrency: 0,
            task_timeout_ms: 250,
            retries: 1,
            retry_delay_ms: 10,
            show_progress: false,
        };
        let options = RunOptions::from(&config);
        assert_eq!(options.max_concurrency, None);
        assert_eq!(options.task_timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.retries, 1);
        assert!(!options.show_progress);
    }
}
