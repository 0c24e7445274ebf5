//! Ferret - Sensitive-Data Scanner
//!
//! Ferret discovers candidate matches for categories of personally
//! identifiable information, credentials, and device-identifying metadata in
//! heterogeneous file formats, scores each match with context-aware
//! confidence, optionally writes a redacted copy of the original file, and
//! formats results for interactive use or as a pre-commit gate.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use ferret::bridge::ValidatorBridge;
//! use ferret::confidence::ConfidenceEngine;
//! use ferret::processor::{ParallelProcessor, discover_files};
//! use ferret::router::FileRouter;
//! use ferret::validators::{MetadataValidator, default_validators};
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let router = FileRouter::new();
//! let capabilities = router.metadata_capable_types();
//! let metadata_validator = MetadataValidator::new(Arc::new(move |t| capabilities.contains(&t)));
//! let bridge = ValidatorBridge::new(default_validators(), Arc::new(metadata_validator));
//!
//! let processor = ParallelProcessor::new(router, bridge, ConfidenceEngine::new());
//! let files = discover_files(&["./docs".into()], true);
//! let outcome = processor.run(files).await;
//! println!("{} findings", outcome.stats.matches_found);
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Router + preprocessors** (`router`, `preprocessors`): turn binary
//!   formats into a uniform [`types::ProcessedContent`]
//! - **Dual-path bridge** (`bridge`): body text and metadata validated in
//!   two concurrent streams, reconciled with a correlation boost
//! - **Confidence engine** (`confidence`): domain context, cross-validator
//!   signals, statistical calibration
//! - **Suppression** (`suppression`): YAML rules hide accepted findings
//! - **Redaction** (`redaction`): format-aware rewriting with an auditable
//!   redaction index

#![deny(unsafe_code)]

pub mod bridge;
pub mod confidence;
pub mod error;
pub mod preprocessors;
pub mod processor;
pub mod report;
pub mod router;
pub mod suppression;
pub mod types;
pub mod validators;

pub mod redaction;

pub use error::{ErrorKind, FerretError, Result};
pub use types::{
    ContextInsights, DocumentStats, Domain, Match, MatchContext, MetaValue, MetadataItem, PreprocessorType,
    ProcessedContent, RedactionMapping, RedactionResult, RedactionStrategyKind, RoutedContent, SkipReason,
    SuppressedMatch,
};

pub use bridge::ValidatorBridge;
pub use confidence::ConfidenceEngine;
pub use processor::{ParallelProcessor, ScanOutcome, discover_files};
pub use redaction::{RedactionConfig, RedactionEngine};
pub use report::{ConfidenceFilter, ReportFormatter, ReportOptions, formatter_for};
pub use router::FileRouter;
pub use suppression::{SuppressionFilter, SuppressionRule};
