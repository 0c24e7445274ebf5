//! Video metadata preprocessor (MP4/MOV/M4V).

use crate::error::Result;
use crate::preprocessors::atoms::{self, MAX_METADATA_READ};
use crate::preprocessors::{Preprocessor, ProcessingContext};
use crate::types::{MetadataItem, PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use std::io::Read;
use std::path::Path;

/// Extracts movie metadata via the bounds-checked atom walk. Produces no
/// body text; track content streams are not parsed.
pub struct VideoPreprocessor;

impl VideoPreprocessor {
    pub fn new() -> Self {
        Self
    }

    fn extract(path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        let buf = read_head(path, MAX_METADATA_READ)?;
        let pairs = atoms::extract_atom_metadata(&buf, &ctx.deadline)?;

        let metadata_items = if pairs.is_empty() {
            Vec::new()
        } else {
            vec![MetadataItem::from_pairs(
                PreprocessorType::Video,
                "video-metadata",
                path,
                &pairs,
            )]
        };
        let mut content = ProcessedContent::success(path, String::new(), metadata_items);
        if content.is_empty() {
            content.error = Some("no movie metadata found".to_string());
        }
        Ok(content)
    }
}

/// Read at most `limit` bytes from the file head.
pub(crate) fn read_head(path: &Path, limit: usize) -> Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::new();
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

impl Default for VideoPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Preprocessor for VideoPreprocessor {
    fn name(&self) -> &str {
        "video-metadata"
    }

    fn extensions(&self) -> &[&str] {
        &["mp4", "mov", "m4v"]
    }

    fn mime_types(&self) -> &[&str] {
        &["video/mp4", "video/quicktime", "video/x-m4v"]
    }

    fn produces_body(&self) -> bool {
        false
    }

    fn produces_metadata(&self) -> bool {
        true
    }

    fn preprocessor_type(&self) -> Option<PreprocessorType> {
        Some(PreprocessorType::Video)
    }

    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        ctx.deadline.check()?;
        let path = path.to_path_buf();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || Self::extract(&path, &ctx))
            .await
            .map_err(|err| crate::error::FerretError::parsing(format!("video worker failed: {}", err)))?
    }
}
