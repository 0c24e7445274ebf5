//! Built-in file preprocessors.
//!
//! A preprocessor transforms one recognized file family into a
//! [`ProcessedContent`]: body text, typed metadata items, or both. All
//! preprocessors implement the [`Preprocessor`] trait and are registered in a
//! fixed order by [`default_registry`]; the file router dispatches first-match
//! by declared extension, then by sniffed MIME type.
//!
//! Preprocessors are pure with respect to the file system outside the input
//! path.

use crate::error::{FerretError, Result};
use crate::types::{PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub mod gps;
pub mod text;

#[cfg(feature = "pdf")]
pub mod pdf;

#[cfg(feature = "office")]
pub mod office;

#[cfg(feature = "image")]
pub mod image;

#[cfg(feature = "media")]
pub mod atoms;
#[cfg(feature = "media")]
pub mod audio;
#[cfg(feature = "media")]
pub mod video;

pub use text::PlainTextPreprocessor;

#[cfg(feature = "pdf")]
pub use pdf::PdfPreprocessor;

#[cfg(feature = "office")]
pub use office::OfficePreprocessor;

#[cfg(feature = "image")]
pub use image::ImagePreprocessor;

#[cfg(feature = "media")]
pub use audio::AudioPreprocessor;
#[cfg(feature = "media")]
pub use video::VideoPreprocessor;

/// Cooperative cancellation handle with an optional wall-clock deadline.
///
/// Long-running walks (atom parsing, XML element streams, PDF pages) call
/// [`Deadline::check`] at each boundary; expiry yields a recoverable
/// `timeout` error and the caller returns a partial result.
#[derive(Debug, Clone)]
pub struct Deadline {
    expires: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { expires: None }
    }

    pub fn after(timeout: Duration) -> Self {
        Self {
            expires: Some(Instant::now() + timeout),
        }
    }

    pub fn expired(&self) -> bool {
        self.expires.is_some_and(|at| Instant::now() >= at)
    }

    /// Error with `error_kind = timeout` once the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.expired() {
            Err(FerretError::timeout("processing deadline exceeded"))
        } else {
            Ok(())
        }
    }
}

/// Per-file processing context handed to preprocessors by the router.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub path: PathBuf,
    pub debug: bool,
    pub deadline: Deadline,
    /// Size of the file as observed when the context was created.
    pub file_size: u64,
}

/// Uniform preprocessor contract.
///
/// Implementations declare the extensions and MIME types they accept, their
/// capability flags, and transform an input file into a `ProcessedContent`.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    /// Unique lowercase-hyphen name, e.g. `"video-metadata"`.
    fn name(&self) -> &str;

    /// Accepted file extensions, lowercase, without the dot.
    fn extensions(&self) -> &[&str];

    /// Accepted MIME types, consulted when the extension is missing or
    /// unknown.
    fn mime_types(&self) -> &[&str];

    fn produces_body(&self) -> bool;

    fn produces_metadata(&self) -> bool;

    /// Metadata family this preprocessor reports under, when it produces any.
    fn preprocessor_type(&self) -> Option<PreprocessorType>;

    /// Transform the input file into a `ProcessedContent`.
    ///
    /// Corrupted sub-structures are logged and skipped; implementations
    /// return a partial result rather than failing the file wherever the
    /// container allows it.
    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent>;

    /// Whether this preprocessor accepts the given extension.
    fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.extensions().iter().any(|e| *e == ext)
    }

    /// Whether this preprocessor accepts the given MIME type.
    fn accepts_mime(&self, mime: &str) -> bool {
        self.mime_types().iter().any(|m| *m == mime)
    }
}

/// The ordered default registry. Selection is first-match, so plaintext is
/// registered last among body producers to keep specific formats ahead of the
/// catch-all text extensions.
pub fn default_registry() -> Vec<Arc<dyn Preprocessor>> {
    let mut registry: Vec<Arc<dyn Preprocessor>> = Vec::new();

    #[cfg(feature = "pdf")]
    registry.push(Arc::new(PdfPreprocessor::new()));

    #[cfg(feature = "office")]
    registry.push(Arc::new(OfficePreprocessor::new()));

    #[cfg(feature = "image")]
    registry.push(Arc::new(ImagePreprocessor::new()));

    #[cfg(feature = "media")]
    {
        registry.push(Arc::new(VideoPreprocessor::new()));
        registry.push(Arc::new(AudioPreprocessor::new()));
    }

    registry.push(Arc::new(PlainTextPreprocessor::new()));
    registry
}
