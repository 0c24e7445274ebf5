//! OOXML redactor.
//!
//! Decodes the ZIP into an ordered `(name, bytes)` map, replaces matched
//! substrings literally (bytewise) in the raw XML payload of text-carrying
//! entries, and re-emits the ZIP with identical entry order. Non-text
//! entries (media, styles, relationships) are copied raw and never touched.

use crate::error::{FerretError, Result};
use crate::preprocessors::office::detect_kind;
use crate::redaction::audit::context_hash;
use crate::redaction::strategies;
use crate::types::{Match, RedactionMapping, RedactionStrategyKind};
use rand::Rng;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tracing::debug;

pub struct OfficeRedaction {
    pub bytes: Vec<u8>,
    pub mappings: Vec<RedactionMapping>,
}

/// Rewrite one OOXML container, redacting every match occurrence inside the
/// document's text-carrying entries.
pub fn redact_office<R: Rng>(
    path: &Path,
    input: &[u8],
    matches: &[Match],
    strategy: RedactionStrategyKind,
    rng: &mut R,
) -> Result<OfficeRedaction> {
    let mut archive = zip::ZipArchive::new(Cursor::new(input))
        .map_err(|err| FerretError::redaction(format!("invalid OOXML container: {}", err)).with_path(path))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let content_types = read_entry_string(&mut archive, "[Content_Types].xml");
    let kind = detect_kind(content_types.as_deref(), &extension)
        .ok_or_else(|| FerretError::redaction("unrecognized OOXML document kind").with_path(path))?;

    let mut out = Cursor::new(Vec::new());
    let mut mappings = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(&mut out);
        for index in 0..archive.len() {
            let name = archive
                .by_index(index)
                .map_err(|err| FerretError::redaction(format!("unreadable ZIP entry: {}", err)).with_path(path))?
                .name()
                .to_string();

            if kind.is_body_entry(&name) {
                let mut entry = archive
                    .by_index(index)
                    .map_err(|err| FerretError::redaction(format!("unreadable ZIP entry: {}", err)))?;
                let mut xml = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut xml)
                    .map_err(|err| FerretError::from(err).with_path(path))?;
                drop(entry);

                let rewritten = redact_entry(&name, xml, matches, strategy, rng, &mut mappings);
                let options =
                    zip::write::SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
                writer
                    .start_file(&*name, options)
                    .map_err(|err| FerretError::redaction(format!("ZIP write failed: {}", err)))?;
                writer
                    .write_all(&rewritten)
                    .map_err(|err| FerretError::from(err).with_path(path))?;
            } else {
                // Refuse to touch non-text entries; raw copy preserves the
                // entry metadata byte for byte.
                let entry = archive
                    .by_index_raw(index)
                    .map_err(|err| FerretError::redaction(format!("unreadable ZIP entry: {}", err)))?;
                writer
                    .raw_copy_file(entry)
                    .map_err(|err| FerretError::redaction(format!("ZIP copy failed: {}", err)))?;
            }
        }
        writer
            .finish()
            .map_err(|err| FerretError::redaction(format!("ZIP finish failed: {}", err)))?;
    }

    Ok(OfficeRedaction {
        bytes: out.into_inner(),
        mappings,
    })
}

/// Bytewise literal replacement of each match's text within one XML payload.
fn redact_entry<R: Rng>(
    entry_name: &str,
    xml: Vec<u8>,
    matches: &[Match],
    strategy: RedactionStrategyKind,
    rng: &mut R,
    mappings: &mut Vec<RedactionMapping>,
) -> Vec<u8> {
    let original = xml;
    let mut current = original.clone();
    for m in matches {
        if m.text.is_empty() {
            continue;
        }
        let needle = m.text.as_bytes();
        let mut search_from = 0usize;
        loop {
            let Some(found) = find_subslice(&current[search_from..], needle) else {
                break;
            };
            let start = search_from + found;
            let end = start + needle.len();
            let replacement = strategies::replacement(strategy, &m.match_type, &m.text, rng);
            current.splice(start..end, replacement.bytes());

            let context = String::from_utf8_lossy(&original);
            mappings.push(RedactionMapping {
                line: m.line_number.unwrap_or(0),
                start,
                end,
                replacement: replacement.clone(),
                data_type: m.match_type.clone(),
                strategy,
                confidence: m.confidence,
                verification_hash: context_hash(&context, start.min(context.len()), end.min(context.len())),
            });
            debug!(entry = entry_name, start, "redacted occurrence");
            search_from = start + replacement.len();
        }
    }
    current
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn read_entry_string(archive: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Option<String> {
    let mut entry = archive.by_name(name).ok()?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
