//! Plaintext pass-through preprocessor.

use crate::error::Result;
use crate::preprocessors::{Preprocessor, ProcessingContext};
use crate::types::{PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use std::path::Path;

/// Reads the file as UTF-8 (lossy, replacement characters permitted) and
/// attaches no metadata.
pub struct PlainTextPreprocessor;

impl PlainTextPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Preprocessor for PlainTextPreprocessor {
    fn name(&self) -> &str {
        "plaintext"
    }

    fn extensions(&self) -> &[&str] {
        &[
            "txt", "text", "md", "markdown", "csv", "tsv", "log", "json", "yaml", "yml", "toml", "xml", "html", "htm",
            "ini", "cfg", "conf", "env", "sh", "py", "rb", "js", "ts", "go", "rs", "java", "c", "h", "cpp", "sql",
        ]
    }

    fn mime_types(&self) -> &[&str] {
        &["text/plain", "text/markdown", "text/csv", "text/html", "application/json"]
    }

    fn produces_body(&self) -> bool {
        true
    }

    fn produces_metadata(&self) -> bool {
        false
    }

    fn preprocessor_type(&self) -> Option<PreprocessorType> {
        None
    }

    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        ctx.deadline.check()?;
        let bytes = tokio::fs::read(path).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok(ProcessedContent::success(path, text, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessors::Deadline;
    use std::io::Write;

    fn ctx(path: &Path) -> ProcessingContext {
        ProcessingContext {
            path: path.to_path_buf(),
            debug: false,
            deadline: Deadline::none(),
            file_size: 0,
        }
    }

    #[tokio::test]
    async fn reads_utf8_text() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        writeln!(file, "Pay to card 4111 1111 1111 1111").unwrap();

        let pre = PlainTextPreprocessor::new();
        let result = pre.process(file.path(), &ctx(file.path())).await.unwrap();
        assert!(result.success);
        assert!(result.text.contains("4111 1111 1111 1111"));
        assert!(result.metadata_items.is_empty());
        assert_eq!(result.stats.word_count, 7);
    }

    #[tokio::test]
    async fn lossy_decode_replaces_invalid_bytes() {
        let mut file = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(&[b'h', b'i', 0xFF, b'!', b'\n']).unwrap();

        let pre = PlainTextPreprocessor::new();
        let result = pre.process(file.path(), &ctx(file.path())).await.unwrap();
        assert!(result.success);
        assert!(result.text.starts_with("hi"));
        assert!(result.text.contains('\u{FFFD}'));
    }
}
