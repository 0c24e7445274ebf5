//! Error types for Ferret.
//!
//! A single taxonomy is applied uniformly across components: every fallible
//! operation returns [`FerretError`], which carries the error kind, the file
//! it concerns (when there is one), a human-readable message, an optional
//! wrapped cause, and a free-form context map.
//!
//! Recoverability is a property of the kind: `file_access` and `timeout`
//! errors may be retried or skipped by the caller; `file_size`,
//! `unsupported_format`, and `parsing` may not. Recoverable errors inside a
//! per-file job never abort the run: the file is logged and skipped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using `FerretError`.
pub type Result<T> = std::result::Result<T, FerretError>;

/// The closed set of error kinds.
///
/// The `Display` form of each kind is the stable snake_case tag used in skip
/// records, audit entries, and report output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileAccess,
    FileSize,
    UnsupportedFormat,
    Parsing,
    Timeout,
    Permission,
    Routing,
    Validation,
    Redaction,
    Configuration,
}

impl ErrorKind {
    /// Stable snake_case tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileAccess => "file_access",
            ErrorKind::FileSize => "file_size",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::Parsing => "parsing",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Permission => "permission",
            ErrorKind::Routing => "routing",
            ErrorKind::Validation => "validation",
            ErrorKind::Redaction => "redaction",
            ErrorKind::Configuration => "configuration",
        }
    }

    /// Whether errors of this kind may be retried or skipped by the caller.
    pub fn recoverable(&self) -> bool {
        matches!(self, ErrorKind::FileAccess | ErrorKind::Timeout)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for all Ferret operations.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct FerretError {
    kind: ErrorKind,
    message: String,
    path: Option<PathBuf>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    context: HashMap<String, String>,
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        #[doc = concat!("Create a `", stringify!($variant), "` error.")]
        pub fn $name<S: Into<String>>(message: S) -> Self {
            Self::new(ErrorKind::$variant, message)
        }
    };
}

impl FerretError {
    /// Create an error of the given kind.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            path: None,
            source: None,
            context: HashMap::new(),
        }
    }

    error_constructor!(file_access, FileAccess);
    error_constructor!(file_size, FileSize);
    error_constructor!(unsupported_format, UnsupportedFormat);
    error_constructor!(parsing, Parsing);
    error_constructor!(timeout, Timeout);
    error_constructor!(permission, Permission);
    error_constructor!(routing, Routing);
    error_constructor!(validation, Validation);
    error_constructor!(redaction, Redaction);
    error_constructor!(configuration, Configuration);

    /// Attach the file this error concerns.
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Attach the wrapped cause.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Add a key/value pair to the free-form context map.
    pub fn with_context<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    /// Whether the caller may retry or skip past this error.
    pub fn recoverable(&self) -> bool {
        self.kind.recoverable()
    }
}

impl From<std::io::Error> for FerretError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
            _ => ErrorKind::FileAccess,
        };
        FerretError::new(kind, err.to_string()).with_source(err)
    }
}

impl From<regex::Error> for FerretError {
    fn from(err: regex::Error) -> Self {
        FerretError::configuration(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for FerretError {
    fn from(err: serde_json::Error) -> Self {
        FerretError::configuration(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_are_snake_case() {
        assert_eq!(ErrorKind::FileAccess.as_str(), "file_access");
        assert_eq!(ErrorKind::UnsupportedFormat.as_str(), "unsupported_format");
        assert_eq!(ErrorKind::Timeout.as_str(), "timeout");
    }

    #[test]
    fn recoverability_follows_kind() {
        assert!(FerretError::file_access("gone").recoverable());
        assert!(FerretError::timeout("too slow").recoverable());
        assert!(!FerretError::parsing("bad box").recoverable());
        assert!(!FerretError::file_size("too big").recoverable());
        assert!(!FerretError::unsupported_format("tiff").recoverable());
    }

    #[test]
    fn io_permission_maps_to_permission_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: FerretError = io.into();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn io_not_found_maps_to_file_access() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: FerretError = io.into();
        assert_eq!(err.kind(), ErrorKind::FileAccess);
        assert!(err.recoverable());
    }

    #[test]
    fn context_and_path_round_trip() {
        let err = FerretError::parsing("truncated atom")
            .with_path("/tmp/clip.mov")
            .with_context("atom", "moov");
        assert_eq!(err.path().unwrap(), Path::new("/tmp/clip.mov"));
        assert_eq!(err.context().get("atom").map(String::as_str), Some("moov"));
        assert_eq!(err.to_string(), "parsing: truncated atom");
    }
}
