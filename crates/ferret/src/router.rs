//! File router: maps an input file to a preprocessor.
//!
//! Selection is first-match over the ordered registry, by declared extension
//! first, then by sniffed MIME type when the extension is missing or unknown.
//! Files on the quiet-skip list (archives, disk images, unsupported movie
//! containers) produce silent skip records the driver consumes without a
//! warning.

use crate::error::{ErrorKind, FerretError, Result};
use crate::preprocessors::{Deadline, Preprocessor, ProcessingContext, default_registry};
use crate::types::{PreprocessorType, ProcessedContent, SkipReason};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-file size ceiling.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
/// Raised ceiling for recognized audio containers.
pub const AUDIO_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;
/// Per-file processing timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extensions skipped silently: containers we knowingly do not scan.
const QUIET_SKIP_EXTENSIONS: &[&str] = &[
    "zip", "tar", "gz", "tgz", "bz2", "xz", "7z", "rar", "iso", "dmg", "img", "vmdk", "avi", "mkv", "webm", "wmv",
    "flv",
];

const AUDIO_EXTENSIONS: &[&str] = &["m4a", "m4b", "mp3", "wav", "flac", "aac"];

/// Outcome of routing one file.
#[derive(Debug)]
pub enum RouteOutcome {
    Processed(ProcessedContent),
    Skipped(SkipReason),
}

pub struct FileRouter {
    preprocessors: Vec<Arc<dyn Preprocessor>>,
    timeout: Duration,
    max_file_size: u64,
    max_audio_file_size: u64,
}

impl FileRouter {
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(preprocessors: Vec<Arc<dyn Preprocessor>>) -> Self {
        Self {
            preprocessors,
            timeout: DEFAULT_TIMEOUT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_audio_file_size: AUDIO_MAX_FILE_SIZE,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn extension(path: &Path) -> String {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// Whether a preprocessor is registered for this path.
    ///
    /// `preprocessors_enabled` mirrors `--enable-preprocessors`: when false
    /// only the plaintext pass-through applies. `genai_enabled` is part of
    /// the contract for drivers with external enrichment; the router itself
    /// ignores it.
    pub fn can_process(&self, path: &Path, preprocessors_enabled: bool, _genai_enabled: bool) -> (bool, String) {
        let ext = Self::extension(path);
        if QUIET_SKIP_EXTENSIONS.contains(&ext.as_str()) {
            return (false, format!("{} containers are not scanned", ext));
        }
        for pre in &self.preprocessors {
            if !preprocessors_enabled && pre.name() != "plaintext" {
                continue;
            }
            if pre.accepts_extension(&ext) {
                return (true, pre.name().to_string());
            }
        }
        (false, format!("no preprocessor accepts extension '{}'", ext))
    }

    /// Types for which a registered preprocessor can produce metadata.
    ///
    /// Handed to the metadata validator as a pure capability query at
    /// construction time.
    pub fn metadata_capable_types(&self) -> HashSet<PreprocessorType> {
        self.preprocessors
            .iter()
            .filter(|p| p.produces_metadata())
            .filter_map(|p| p.preprocessor_type())
            .collect()
    }

    /// Open the file with a bounded size and attach the processing deadline.
    pub fn create_processing_context(&self, path: &Path, debug: bool) -> Result<ProcessingContext> {
        let meta = std::fs::metadata(path).map_err(|err| FerretError::from(err).with_path(path))?;
        let ceiling = if AUDIO_EXTENSIONS.contains(&Self::extension(path).as_str()) {
            self.max_audio_file_size
        } else {
            self.max_file_size
        };
        if meta.len() > ceiling {
            return Err(FerretError::file_size(format!(
                "file is {} bytes, ceiling is {} bytes",
                meta.len(),
                ceiling
            ))
            .with_path(path));
        }
        Ok(ProcessingContext {
            path: path.to_path_buf(),
            debug,
            deadline: Deadline::after(self.timeout),
            file_size: meta.len(),
        })
    }

    fn select(&self, path: &Path) -> Option<Arc<dyn Preprocessor>> {
        let ext = Self::extension(path);
        if !ext.is_empty()
            && let Some(found) = self.preprocessors.iter().find(|p| p.accepts_extension(&ext))
        {
            return Some(Arc::clone(found));
        }

        // Extension missing or unknown: sniff content, then guess from name.
        let sniffed = infer::get_from_path(path).ok().flatten().map(|t| t.mime_type().to_string());
        let guessed = mime_guess::from_path(path).first_raw().map(|m| m.to_string());
        for mime in [sniffed, guessed].into_iter().flatten() {
            if let Some(found) = self.preprocessors.iter().find(|p| p.accepts_mime(&mime)) {
                return Some(Arc::clone(found));
            }
        }
        None
    }

    /// Select the first preprocessor that accepts the path and delegate.
    pub async fn process(&self, path: &Path, ctx: &ProcessingContext) -> ProcessedContent {
        let Some(pre) = self.select(path) else {
            return ProcessedContent::failure(path, "unsupported file type".to_string());
        };

        debug!(path = %path.display(), preprocessor = pre.name(), "dispatching");
        match tokio::time::timeout(self.timeout, pre.process(path, ctx)).await {
            Ok(Ok(content)) => content,
            Ok(Err(err)) => {
                if err.kind() == ErrorKind::Timeout {
                    ProcessedContent::failure(path, "timeout".to_string())
                } else {
                    warn!(path = %path.display(), error = %err, "preprocessor failed");
                    ProcessedContent::failure(path, err.to_string())
                }
            }
            Err(_elapsed) => ProcessedContent::failure(path, "timeout".to_string()),
        }
    }

    /// Full routing decision for one file.
    pub async fn route(&self, path: &Path, debug: bool, preprocessors_enabled: bool) -> RouteOutcome {
        let ext = Self::extension(path);
        if QUIET_SKIP_EXTENSIONS.contains(&ext.as_str()) {
            return RouteOutcome::Skipped(SkipReason {
                path: path.to_path_buf(),
                error_kind: ErrorKind::UnsupportedFormat,
                message: format!("{} containers are not scanned", ext),
                silent: true,
            });
        }

        let (ok, reason) = self.can_process(path, preprocessors_enabled, false);
        if !ok {
            return RouteOutcome::Skipped(SkipReason {
                path: path.to_path_buf(),
                error_kind: ErrorKind::UnsupportedFormat,
                message: reason,
                silent: false,
            });
        }

        let ctx = match self.create_processing_context(path, debug) {
            Ok(ctx) => ctx,
            Err(err) => {
                return RouteOutcome::Skipped(SkipReason {
                    path: path.to_path_buf(),
                    error_kind: err.kind(),
                    message: err.to_string(),
                    silent: false,
                });
            }
        };

        RouteOutcome::Processed(self.process(path, &ctx).await)
    }
}

impl Default for FileRouter {
    fn default() -> Self {
        Self::new()
    }
}
