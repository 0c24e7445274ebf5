//! Format-aware redaction engine.
//!
//! Strategy selection, per-format redactors, the output-structure manager,
//! the audit log, and the failure-recovery ladder. The engine is the only
//! writer of redacted output; access to the output manager and the audit log
//! is serialized behind the engine's lock.

use crate::error::{FerretError, Result};
use crate::preprocessors::Deadline;
use crate::types::{Match, ProcessedContent, RedactionMapping, RedactionResult, RedactionStrategyKind};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

pub mod audit;
pub mod image;
#[cfg(feature = "office")]
pub mod office;
pub mod output;
pub mod pdf;
pub mod plaintext;
pub mod recovery;
pub mod strategies;

pub use audit::AuditLog;
pub use output::OutputManager;
pub use recovery::{PARTIAL_MIN_CONFIDENCE, RecoveryPolicy, RecoveryStep};

/// Maximum workers in a batch redaction pool.
pub const DEFAULT_REDACTION_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub output_dir: PathBuf,
    pub strategy: RedactionStrategyKind,
    pub audit_log_path: Option<PathBuf>,
    pub backups: bool,
    pub recovery: RecoveryPolicy,
}

impl RedactionConfig {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
            strategy: RedactionStrategyKind::Simple,
            audit_log_path: None,
            backups: false,
            recovery: RecoveryPolicy::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: RedactionStrategyKind) -> Self {
        self.strategy = strategy;
        self
    }
}

pub struct RedactionEngine {
    config: RedactionConfig,
    output: OutputManager,
    audit: Mutex<AuditLog>,
}

impl RedactionEngine {
    pub fn new(config: RedactionConfig) -> Result<Self> {
        let output = OutputManager::new(&config.output_dir)?;
        Ok(Self {
            config,
            output,
            audit: Mutex::new(AuditLog::new()),
        })
    }

    /// Redact one file, walking the recovery ladder on failure.
    pub fn redact_file(&self, content: &ProcessedContent, matches: &[Match]) -> RedactionResult {
        let started = Instant::now();
        let path = content.original_path.as_path();

        if self.config.backups
            && let Err(err) = self.backup_original(path)
        {
            warn!(path = %path.display(), error = %err, "backup failed, continuing");
        }

        let deadline = Deadline::after(self.config.recovery.total_timeout);
        let mut last_error = match self.attempt(content, matches, self.config.strategy, None) {
            Ok((output_path, mappings)) => {
                return self.finish(path, output_path, mappings, started, None);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "redaction failed, entering recovery");
                err
            }
        };

        for step in self.config.recovery.ladder(self.config.strategy) {
            if deadline.expired() {
                last_error = FerretError::timeout("recovery timeout exceeded").with_path(path);
                break;
            }
            debug!(path = %path.display(), ?step, "recovery step");
            let outcome = match step {
                RecoveryStep::Retry(strategy) => self.attempt(content, matches, strategy, None),
                RecoveryStep::SimpleFallback => {
                    self.attempt(content, matches, RedactionStrategyKind::Simple, None)
                }
                RecoveryStep::Partial => self.attempt(
                    content,
                    matches,
                    RedactionStrategyKind::Simple,
                    Some(PARTIAL_MIN_CONFIDENCE),
                ),
                RecoveryStep::VerbatimCopy => {
                    warn!(path = %path.display(), "copying original VERBATIM: output contains unredacted sensitive data");
                    match self.copy_verbatim(path) {
                        Ok(output_path) => {
                            let mut result = self.finish(path, output_path, Vec::new(), started, None);
                            result.confidence = 0.0;
                            result.error = Some("copied verbatim without redaction".to_string());
                            return result;
                        }
                        Err(err) => Err(err),
                    }
                }
                RecoveryStep::SkipPlaceholder => {
                    let message = last_error.to_string();
                    match self.write_placeholder(path, &message) {
                        Ok(output_path) => {
                            let mut result = self.finish(path, output_path, Vec::new(), started, Some(message));
                            result.success = false;
                            return result;
                        }
                        Err(err) => Err(err),
                    }
                }
            };
            match outcome {
                Ok((output_path, mappings)) => {
                    return self.finish(path, output_path, mappings, started, None);
                }
                Err(err) => last_error = err,
            }
        }

        RedactionResult {
            success: false,
            output_path: None,
            mappings: Vec::new(),
            duration: started.elapsed(),
            confidence: 0.0,
            error: Some(last_error.to_string()),
        }
    }

    /// One redaction attempt with the given strategy, optionally restricted
    /// to matches at or above a confidence floor.
    fn attempt(
        &self,
        content: &ProcessedContent,
        matches: &[Match],
        strategy: RedactionStrategyKind,
        min_confidence: Option<f64>,
    ) -> Result<(PathBuf, Vec<RedactionMapping>)> {
        let filtered: Vec<Match> = match min_confidence {
            Some(floor) => matches.iter().filter(|m| m.confidence >= floor).cloned().collect(),
            None => matches.to_vec(),
        };
        let path = content.original_path.as_path();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let mut rng = rand::rng();

        match extension.as_str() {
            #[cfg(feature = "office")]
            "docx" | "xlsx" | "pptx" => {
                let input = std::fs::read(path).map_err(|err| FerretError::from(err).with_path(path))?;
                let redaction = office::redact_office(path, &input, &filtered, strategy, &mut rng)?;
                let output_path = self.output.prepare(path)?;
                self.output.write(&output_path, &redaction.bytes)?;
                Ok((output_path, redaction.mappings))
            }
            "pdf" => {
                let redaction = pdf::redact_pdf_text(&content.text, &filtered, strategy, &mut rng);
                let companion = path.with_extension("redacted.txt");
                let output_path = self.output.prepare(&companion)?;
                self.output.write(&output_path, redaction.companion_text.as_bytes())?;
                Ok((output_path, redaction.mappings))
            }
            "jpg" | "jpeg" | "png" => {
                let input = std::fs::read(path).map_err(|err| FerretError::from(err).with_path(path))?;
                let stripped = image::strip_image_metadata(path, &input)?;
                let output_path = self.output.prepare(path)?;
                self.output.write(&output_path, &stripped)?;
                // Metadata removal is wholesale; record one mapping per
                // metadata-derived match.
                let mappings = filtered
                    .iter()
                    .filter(|m| m.line_number.is_none())
                    .map(|m| RedactionMapping {
                        line: 0,
                        start: 0,
                        end: 0,
                        replacement: strategies::simple_tag(&m.match_type),
                        data_type: m.match_type.clone(),
                        strategy,
                        confidence: m.confidence,
                        verification_hash: audit::context_hash("", 0, 0),
                    })
                    .collect();
                Ok((output_path, mappings))
            }
            _ => {
                let redaction = plaintext::redact_text(&content.text, &filtered, strategy, &mut rng);
                let output_path = self.output.prepare(path)?;
                self.output.write(&output_path, redaction.redacted.as_bytes())?;
                Ok((output_path, redaction.mappings))
            }
        }
    }

    fn finish(
        &self,
        input: &Path,
        output_path: PathBuf,
        mappings: Vec<RedactionMapping>,
        started: Instant,
        error: Option<String>,
    ) -> RedactionResult {
        {
            let mut audit = self.audit.lock();
            for mapping in &mappings {
                audit.record(input, mapping);
            }
        }
        RedactionResult {
            success: true,
            output_path: Some(output_path),
            confidence: RedactionResult::overall_confidence(&mappings),
            mappings,
            duration: started.elapsed(),
            error,
        }
    }

    fn backup_original(&self, path: &Path) -> Result<()> {
        let backup_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => format!("{}.bak", name),
            None => return Err(FerretError::redaction("input has no file name").with_path(path)),
        };
        let backup_path = self.output.prepare(&path.with_file_name(backup_name))?;
        let bytes = std::fs::read(path).map_err(|err| FerretError::from(err).with_path(path))?;
        self.output.write(&backup_path, &bytes)
    }

    fn copy_verbatim(&self, path: &Path) -> Result<PathBuf> {
        let bytes = std::fs::read(path).map_err(|err| FerretError::from(err).with_path(path))?;
        let output_path = self.output.prepare(path)?;
        self.output.write(&output_path, &bytes)?;
        Ok(output_path)
    }

    fn write_placeholder(&self, path: &Path, reason: &str) -> Result<PathBuf> {
        let placeholder = path.with_extension("skipped.txt");
        let output_path = self.output.prepare(&placeholder)?;
        self.output
            .write(&output_path, format!("redaction skipped: {}\n", reason).as_bytes())?;
        Ok(output_path)
    }

    /// Write the audit log if a path was configured.
    pub fn write_audit_log(&self) -> Result<Option<PathBuf>> {
        let Some(path) = &self.config.audit_log_path else {
            return Ok(None);
        };
        self.audit.lock().write_to(path)?;
        Ok(Some(path.clone()))
    }

    pub fn audit_entry_count(&self) -> usize {
        self.audit.lock().redactions.len()
    }
}
