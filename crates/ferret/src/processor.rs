//! Parallel per-file processing.
//!
//! A bounded pool of tokio tasks runs the full per-file pipeline: router →
//! preprocessor → dual-path bridge → confidence engine → suppression →
//! optional redaction. Progress callbacks fire per completed job. The
//! redaction engine, when present, is gated by its own smaller pool.

use crate::bridge::ValidatorBridge;
use crate::confidence::ConfidenceEngine;
use crate::error::ErrorKind;
use crate::redaction::{DEFAULT_REDACTION_WORKERS, RedactionEngine};
use crate::router::{FileRouter, RouteOutcome};
use crate::suppression::SuppressionFilter;
use crate::types::{ContextInsights, Match, ProcessedContent, RedactionResult, SkipReason, SuppressedMatch};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default worker count: the minimum of 8 and detected parallelism.
pub fn default_workers() -> usize {
    8.min(num_cpus::get().max(1))
}

/// Guarded statistics counters; reads return snapshot copies.
#[derive(Debug, Default)]
pub struct ScanStats {
    files_processed: AtomicU64,
    files_skipped: AtomicU64,
    matches_found: AtomicU64,
    matches_suppressed: AtomicU64,
    processing_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ScanStatsSnapshot {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub matches_found: u64,
    pub matches_suppressed: u64,
    pub processing_errors: u64,
}

impl ScanStats {
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            matches_found: self.matches_found.load(Ordering::Relaxed),
            matches_suppressed: self.matches_suppressed.load(Ordering::Relaxed),
            processing_errors: self.processing_errors.load(Ordering::Relaxed),
        }
    }
}

/// Everything the scan produced for one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub matches: Vec<Match>,
    pub suppressed: Vec<SuppressedMatch>,
    pub skip: Option<SkipReason>,
    pub insights: Option<ContextInsights>,
    pub redaction: Option<RedactionResult>,
    pub partial_failure: Option<String>,
    /// Retained for `--preprocess-only` runs.
    pub processed: Option<ProcessedContent>,
}

impl FileReport {
    fn skipped(path: PathBuf, skip: SkipReason) -> Self {
        Self {
            path,
            matches: Vec::new(),
            suppressed: Vec::new(),
            skip: Some(skip),
            insights: None,
            redaction: None,
            partial_failure: None,
            processed: None,
        }
    }
}

/// Aggregated scan result.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub reports: Vec<FileReport>,
    pub stats: ScanStatsSnapshot,
}

pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

pub struct ParallelProcessor {
    router: Arc<FileRouter>,
    bridge: Arc<ValidatorBridge>,
    engine: Arc<ConfidenceEngine>,
    suppression: Arc<SuppressionFilter>,
    redaction: Option<Arc<RedactionEngine>>,
    workers: usize,
    preprocessors_enabled: bool,
    preprocess_only: bool,
    debug: bool,
    progress: Option<ProgressCallback>,
    stats: Arc<ScanStats>,
}

impl ParallelProcessor {
    pub fn new(router: FileRouter, bridge: ValidatorBridge, engine: ConfidenceEngine) -> Self {
        Self {
            router: Arc::new(router),
            bridge: Arc::new(bridge),
            engine: Arc::new(engine),
            suppression: Arc::new(SuppressionFilter::empty()),
            redaction: None,
            workers: default_workers(),
            preprocessors_enabled: true,
            preprocess_only: false,
            debug: false,
            progress: None,
            stats: Arc::new(ScanStats::default()),
        }
    }

    pub fn with_suppression(mut self, suppression: SuppressionFilter) -> Self {
        self.suppression = Arc::new(suppression);
        self
    }

    pub fn with_redaction(mut self, redaction: RedactionEngine) -> Self {
        self.redaction = Some(Arc::new(redaction));
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_preprocessors_enabled(mut self, enabled: bool) -> Self {
        self.preprocessors_enabled = enabled;
        self
    }

    pub fn preprocess_only(mut self, enabled: bool) -> Self {
        self.preprocess_only = enabled;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn stats(&self) -> ScanStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn redaction_engine(&self) -> Option<&Arc<RedactionEngine>> {
        self.redaction.as_ref()
    }

    /// Process all files through the bounded pool.
    pub async fn run(&self, files: Vec<PathBuf>) -> ScanOutcome {
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let redaction_gate = Arc::new(Semaphore::new(DEFAULT_REDACTION_WORKERS));
        let mut jobs = JoinSet::new();

        for path in files {
            let semaphore = Arc::clone(&semaphore);
            let redaction_gate = Arc::clone(&redaction_gate);
            let router = Arc::clone(&self.router);
            let bridge = Arc::clone(&self.bridge);
            let engine = Arc::clone(&self.engine);
            let suppression = Arc::clone(&self.suppression);
            let redaction = self.redaction.clone();
            let preprocessors_enabled = self.preprocessors_enabled;
            let preprocess_only = self.preprocess_only;
            let debug = self.debug;
            let stats = Arc::clone(&self.stats);

            jobs.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                run_job(
                    path,
                    router,
                    bridge,
                    engine,
                    suppression,
                    redaction,
                    redaction_gate,
                    preprocessors_enabled,
                    preprocess_only,
                    debug,
                    stats,
                )
                .await
            });
        }

        let mut reports = Vec::with_capacity(total);
        let mut completed = 0usize;
        while let Some(joined) = jobs.join_next().await {
            completed += 1;
            match joined {
                Ok(report) => reports.push(report),
                Err(err) => {
                    // A panicking job is converted into a parsing skip; the
                    // run continues.
                    warn!(error = %err, "per-file job panicked");
                    self.stats.processing_errors.fetch_add(1, Ordering::Relaxed);
                    reports.push(FileReport::skipped(
                        PathBuf::new(),
                        SkipReason {
                            path: PathBuf::new(),
                            error_kind: ErrorKind::Parsing,
                            message: format!("job panicked: {}", err),
                            silent: false,
                        },
                    ));
                }
            }
            if let Some(progress) = &self.progress {
                progress(completed, total);
            }
        }

        // Deterministic aggregate order regardless of completion order.
        reports.sort_by(|a, b| a.path.cmp(&b.path));
        ScanOutcome {
            reports,
            stats: self.stats.snapshot(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_job(
    path: PathBuf,
    router: Arc<FileRouter>,
    bridge: Arc<ValidatorBridge>,
    engine: Arc<ConfidenceEngine>,
    suppression: Arc<SuppressionFilter>,
    redaction: Option<Arc<RedactionEngine>>,
    redaction_gate: Arc<Semaphore>,
    preprocessors_enabled: bool,
    preprocess_only: bool,
    debug: bool,
    stats: Arc<ScanStats>,
) -> FileReport {
    let processed = match router.route(&path, debug, preprocessors_enabled).await {
        RouteOutcome::Processed(processed) => processed,
        RouteOutcome::Skipped(skip) => {
            stats.files_skipped.fetch_add(1, Ordering::Relaxed);
            if !skip.silent {
                debug!(path = %path.display(), reason = %skip.message, "skipped");
            }
            return FileReport::skipped(path, skip);
        }
    };

    if !processed.success && processed.is_empty() {
        stats.files_skipped.fetch_add(1, Ordering::Relaxed);
        let message = processed.error.clone().unwrap_or_else(|| "preprocessing failed".to_string());
        let error_kind = if message == "timeout" { ErrorKind::Timeout } else { ErrorKind::Parsing };
        let skip = SkipReason {
            path: path.clone(),
            error_kind,
            message,
            silent: false,
        };
        let mut report = FileReport::skipped(path, skip);
        report.processed = Some(processed);
        return report;
    }

    stats.files_processed.fetch_add(1, Ordering::Relaxed);

    if preprocess_only {
        return FileReport {
            path,
            matches: Vec::new(),
            suppressed: Vec::new(),
            skip: None,
            insights: None,
            redaction: None,
            partial_failure: None,
            processed: Some(processed),
        };
    }

    let outcome = match bridge.validate(&processed).await {
        Ok(outcome) => outcome,
        Err(err) => {
            stats.processing_errors.fetch_add(1, Ordering::Relaxed);
            return FileReport::skipped(
                path,
                SkipReason {
                    path: processed.original_path.clone(),
                    error_kind: err.kind(),
                    message: err.to_string(),
                    silent: false,
                },
            );
        }
    };

    let mut matches = outcome.matches;
    let insights = engine.apply(&path, &processed.text, &mut matches);
    let (kept, suppressed) = suppression.filter(matches);

    stats.matches_found.fetch_add(kept.len() as u64, Ordering::Relaxed);
    stats.matches_suppressed.fetch_add(suppressed.len() as u64, Ordering::Relaxed);

    let redaction_result = match redaction {
        Some(engine) if !kept.is_empty() => {
            let _permit = redaction_gate.acquire_owned().await.expect("semaphore closed");
            let content = processed.clone();
            let matches_for_redaction = kept.clone();
            match tokio::task::spawn_blocking(move || engine.redact_file(&content, &matches_for_redaction)).await {
                Ok(result) => Some(result),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "redaction job failed");
                    None
                }
            }
        }
        _ => None,
    };

    FileReport {
        path,
        matches: kept,
        suppressed,
        skip: None,
        insights: Some(insights),
        redaction: redaction_result,
        partial_failure: outcome.partial_failure,
        processed: None,
    }
}

/// Expand the input paths: files pass through, directories are walked
/// (recursively when requested). Hidden entries are skipped.
pub fn discover_files(inputs: &[PathBuf], recursive: bool) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            continue;
        }
        let max_depth = if recursive { usize::MAX } else { 1 };
        for entry in walkdir::WalkDir::new(input)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.path()))
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    files.sort();
    files.dedup();
    files
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::{MetadataValidator, default_validators};
    use parking_lot::Mutex;

    fn processor() -> ParallelProcessor {
        let router = FileRouter::new();
        let bridge = ValidatorBridge::new(
            default_validators(),
            Arc::new(MetadataValidator::permissive()),
        );
        ParallelProcessor::new(router, bridge, ConfidenceEngine::new())
    }

    #[tokio::test]
    async fn scans_directory_and_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("payment.txt"), "Pay to card 4111 1111 1111 1111\n").unwrap();
        std::fs::write(dir.path().join("clean.txt"), "nothing to see\n").unwrap();

        let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let processor = processor().with_progress(Arc::new(move |done, total| {
            seen_cb.lock().push((done, total));
        }));

        let files = discover_files(&[dir.path().to_path_buf()], false);
        assert_eq!(files.len(), 2);
        let outcome = processor.run(files).await;

        assert_eq!(outcome.reports.len(), 2);
        let card_report = outcome
            .reports
            .iter()
            .find(|r| r.path.ends_with("payment.txt"))
            .unwrap();
        assert_eq!(card_report.matches.len(), 1);
        assert!(card_report.matches[0].confidence >= 90.0);

        let progress = seen.lock();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress.last(), Some(&(2, 2)));
        assert_eq!(outcome.stats.files_processed, 2);
        assert_eq!(outcome.stats.matches_found, 1);
    }

    #[tokio::test]
    async fn idempotent_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hr.txt"), "SSN 123-45-6789\nemail maria@acme.io\n").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], false);
        let first = processor().run(files.clone()).await;
        let second = processor().run(files).await;

        let summarize = |outcome: &ScanOutcome| -> Vec<(String, String, u64)> {
            outcome
                .reports
                .iter()
                .flat_map(|r| r.matches.iter())
                .map(|m| (m.match_type.clone(), m.text.clone(), m.confidence.round() as u64))
                .collect()
        };
        assert_eq!(summarize(&first), summarize(&second));
    }

    #[tokio::test]
    async fn preprocess_only_keeps_extracted_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "SSN 123-45-6789\n").unwrap();

        let processor = processor().preprocess_only(true);
        let outcome = processor.run(discover_files(&[dir.path().to_path_buf()], false)).await;
        let report = &outcome.reports[0];
        assert!(report.matches.is_empty());
        assert!(report.processed.as_ref().unwrap().text.contains("123-45-6789"));
    }

    #[test]
    fn discover_respects_recursion_flag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested/deep")).unwrap();
        std::fs::write(dir.path().join("top.txt"), "x").unwrap();
        std::fs::write(dir.path().join("nested/deep/inner.txt"), "x").unwrap();

        let flat = discover_files(&[dir.path().to_path_buf()], false);
        assert_eq!(flat.len(), 1);
        let deep = discover_files(&[dir.path().to_path_buf()], true);
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn default_worker_count_is_bounded() {
        assert!(default_workers() >= 1);
        assert!(default_workers() <= 8);
    }
}
