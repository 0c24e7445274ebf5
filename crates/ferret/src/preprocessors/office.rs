//! OOXML (DOCX/XLSX/PPTX) preprocessor.
//!
//! Walks the ZIP container, identifies the document kind from
//! `[Content_Types].xml`, streams the text-carrying XML entries with
//! quick-xml, and emits the concatenated character data of the per-kind leaf
//! text elements with single-space separators. Core document properties
//! (creator, last modifier, dates) are surfaced as `office` metadata items.

use crate::error::Result;
use crate::preprocessors::{Deadline, Preprocessor, ProcessingContext};
use crate::types::{DocumentStats, MetadataItem, PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OoxmlKind {
    Docx,
    Xlsx,
    Pptx,
}

impl OoxmlKind {
    /// Leaf elements whose character data is body text, by local name.
    pub(crate) fn leaf_elements(&self) -> &'static [&'static [u8]] {
        match self {
            OoxmlKind::Docx => &[b"t", b"delText"],
            OoxmlKind::Xlsx => &[b"t", b"v", b"f"],
            OoxmlKind::Pptx => &[b"t"],
        }
    }

    /// Whether a ZIP entry contains body text for this document kind.
    pub(crate) fn is_body_entry(&self, name: &str) -> bool {
        match self {
            OoxmlKind::Docx => {
                name == "word/document.xml"
                    || (name.starts_with("word/header") && name.ends_with(".xml"))
                    || (name.starts_with("word/footer") && name.ends_with(".xml"))
                    || (name.starts_with("word/footnote") && name.ends_with(".xml"))
                    || (name.starts_with("word/endnote") && name.ends_with(".xml"))
                    || (name.starts_with("word/comment") && name.ends_with(".xml"))
            }
            OoxmlKind::Xlsx => {
                (name.starts_with("xl/worksheets/") && name.ends_with(".xml")) || name == "xl/sharedStrings.xml"
            }
            OoxmlKind::Pptx => {
                (name.starts_with("ppt/slides/")
                    || name.starts_with("ppt/slideLayouts/")
                    || name.starts_with("ppt/slideMasters/"))
                    && name.ends_with(".xml")
            }
        }
    }
}

/// Detect the document kind from `[Content_Types].xml`, falling back to the
/// file extension.
pub(crate) fn detect_kind(content_types: Option<&str>, extension: &str) -> Option<OoxmlKind> {
    if let Some(xml) = content_types {
        if xml.contains("wordprocessingml") {
            return Some(OoxmlKind::Docx);
        }
        if xml.contains("spreadsheetml") {
            return Some(OoxmlKind::Xlsx);
        }
        if xml.contains("presentationml") {
            return Some(OoxmlKind::Pptx);
        }
    }
    match extension {
        "docx" => Some(OoxmlKind::Docx),
        "xlsx" => Some(OoxmlKind::Xlsx),
        "pptx" => Some(OoxmlKind::Pptx),
        _ => None,
    }
}

/// Stream one XML entry and collect the character data of the leaf text
/// elements, separated by single spaces.
fn extract_entry_text(xml: &[u8], leaves: &[&[u8]], deadline: &Deadline) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().check_end_names = false;

    let mut out = String::new();
    let mut leaf_depth = 0usize;
    let mut buf = Vec::new();
    loop {
        deadline.check()?;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if leaves.contains(&e.local_name().as_ref()) {
                    leaf_depth += 1;
                }
            }
            Ok(Event::End(e)) => {
                if leaf_depth > 0 && leaves.contains(&e.local_name().as_ref()) {
                    leaf_depth -= 1;
                }
            }
            Ok(Event::Text(e)) if leaf_depth > 0 => {
                let text = String::from_utf8_lossy(e.as_ref());
                if !text.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                // Malformed entry: keep what was collected so far.
                debug!(error = %err, "XML walk stopped early");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

/// Pull simple named elements out of `docProps/core.xml` / `docProps/app.xml`.
fn extract_doc_props(xml: &[u8], wanted: &[(&[u8], &str)]) -> Vec<(String, String)> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().check_end_names = false;

    let mut pairs = Vec::new();
    let mut current: Option<&str> = None;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current = wanted
                    .iter()
                    .find(|(local, _)| *local == e.local_name().as_ref())
                    .map(|(_, key)| *key);
            }
            Ok(Event::Text(e)) => {
                if let Some(key) = current {
                    let value = String::from_utf8_lossy(e.as_ref()).trim().to_string();
                    if !value.is_empty() {
                        pairs.push((key.to_string(), value));
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    pairs
}

/// DOCX/XLSX/PPTX ZIP+XML walker.
pub struct OfficePreprocessor;

impl OfficePreprocessor {
    pub fn new() -> Self {
        Self
    }

    fn extract(path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        let file = std::fs::File::open(path)?;
        let mut archive = match zip::ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(err) => {
                return Ok(ProcessedContent::failure(path, format!("invalid OOXML container: {}", err)));
            }
        };

        let content_types = read_entry(&mut archive, "[Content_Types].xml");
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let Some(kind) = detect_kind(content_types.as_deref(), &extension) else {
            return Ok(ProcessedContent::failure(
                path,
                "unrecognized OOXML document kind".to_string(),
            ));
        };

        let mut body_parts: Vec<String> = Vec::new();
        let mut page_count = 0usize;
        for index in 0..archive.len() {
            ctx.deadline.check()?;
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(path = %path.display(), index, error = %err, "skipping unreadable ZIP entry");
                    continue;
                }
            };
            let name = entry.name().to_string();
            if !kind.is_body_entry(&name) {
                continue;
            }
            if kind == OoxmlKind::Pptx && name.starts_with("ppt/slides/") {
                page_count += 1;
            }
            let mut xml = Vec::with_capacity(entry.size() as usize);
            if entry.read_to_end(&mut xml).is_err() {
                debug!(path = %path.display(), entry = %name, "failed to read ZIP entry");
                continue;
            }
            let text = extract_entry_text(&xml, kind.leaf_elements(), &ctx.deadline)?;
            if !text.is_empty() {
                body_parts.push(text);
            }
        }

        let mut metadata_items = Vec::new();
        let mut props: Vec<(String, String)> = Vec::new();
        if let Some(core) = read_entry_bytes(&mut archive, "docProps/core.xml") {
            props.extend(extract_doc_props(
                &core,
                &[
                    (b"title", "Title"),
                    (b"creator", "Creator"),
                    (b"lastModifiedBy", "LastModifiedBy"),
                    (b"created", "Created"),
                    (b"modified", "Modified"),
                ],
            ));
        }
        if let Some(app) = read_entry_bytes(&mut archive, "docProps/app.xml") {
            props.extend(extract_doc_props(&app, &[(b"Application", "Application"), (b"Company", "Company")]));
        }
        if !props.is_empty() {
            metadata_items.push(MetadataItem::from_pairs(
                PreprocessorType::Office,
                "office",
                path,
                &props,
            ));
        }

        let text = body_parts.join("\n");
        let mut content = ProcessedContent::success(path, text, metadata_items);
        content.stats = DocumentStats::from_text(&content.text, page_count.max(1));
        if content.is_empty() {
            content.success = false;
            content.error = Some("no body text or document properties found".to_string());
        }
        Ok(content)
    }
}

fn read_entry<R: std::io::Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Option<String> {
    read_entry_bytes(archive, name).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

fn read_entry_bytes<R: std::io::Read + std::io::Seek>(archive: &mut zip::ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut entry = archive.by_name(name).ok()?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

impl Default for OfficePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Preprocessor for OfficePreprocessor {
    fn name(&self) -> &str {
        "office"
    }

    fn extensions(&self) -> &[&str] {
        &["docx", "xlsx", "pptx"]
    }

    fn mime_types(&self) -> &[&str] {
        &[
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ]
    }

    fn produces_body(&self) -> bool {
        true
    }

    fn produces_metadata(&self) -> bool {
        true
    }

    fn preprocessor_type(&self) -> Option<PreprocessorType> {
        Some(PreprocessorType::Office)
    }

    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        ctx.deadline.check()?;
        let path = path.to_path_buf();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || Self::extract(&path, &ctx))
            .await
            .map_err(|err| crate::error::FerretError::parsing(format!("OOXML worker failed: {}", err)))?
    }
}
