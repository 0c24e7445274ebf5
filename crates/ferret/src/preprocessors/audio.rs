//! Audio metadata preprocessor.
//!
//! M4A/M4B share the MP4 atom container and reuse the atom walker; MP3 files
//! get a bounds-checked ID3v2 text-frame parse. WAV and FLAC are recognized
//! for routing and the raised size ceiling, but untagged files emit nothing.

use crate::error::Result;
use crate::preprocessors::atoms::{self, MAX_METADATA_READ};
use crate::preprocessors::video::read_head;
use crate::preprocessors::{Preprocessor, ProcessingContext};
use crate::types::{MetadataItem, PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

pub struct AudioPreprocessor;

impl AudioPreprocessor {
    pub fn new() -> Self {
        Self
    }

    fn extract(path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        let buf = read_head(path, MAX_METADATA_READ)?;
        ctx.deadline.check()?;

        let pairs = if buf.starts_with(b"ID3") {
            parse_id3v2(&buf)
        } else {
            atoms::extract_atom_metadata(&buf, &ctx.deadline)?
        };

        let metadata_items = if pairs.is_empty() {
            Vec::new()
        } else {
            vec![MetadataItem::from_pairs(
                PreprocessorType::Audio,
                "audio-metadata",
                path,
                &pairs,
            )]
        };
        let mut content = ProcessedContent::success(path, String::new(), metadata_items);
        if content.is_empty() {
            content.error = Some("no audio metadata found".to_string());
        }
        Ok(content)
    }
}

fn syncsafe_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, b| (acc << 7) | u32::from(b & 0x7F))
}

fn decode_text_frame(payload: &[u8]) -> Option<String> {
    let (&encoding, body) = payload.split_first()?;
    let text = match encoding {
        // UTF-16 with BOM (and the BOM-less BE variant).
        1 | 2 => {
            let big_endian = encoding == 2 || body.starts_with(&[0xFE, 0xFF]);
            let body = body
                .strip_prefix(&[0xFF, 0xFE])
                .or_else(|| body.strip_prefix(&[0xFE, 0xFF]))
                .unwrap_or(body);
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|pair| {
                    if big_endian {
                        u16::from_be_bytes([pair[0], pair[1]])
                    } else {
                        u16::from_le_bytes([pair[0], pair[1]])
                    }
                })
                .collect();
            char::decode_utf16(units).map(|c| c.unwrap_or('\u{FFFD}')).collect()
        }
        // Latin-1 and UTF-8 are both handled tolerantly.
        _ => String::from_utf8_lossy(body).into_owned(),
    };
    let text = text.trim_matches(char::from(0)).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Walk ID3v2.3/2.4 frames, collecting the common text frames.
fn parse_id3v2(buf: &[u8]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if buf.len() < 10 {
        return pairs;
    }
    let major = buf[3];
    let tag_size = syncsafe_u32(&buf[6..10]) as usize;
    let end = (10 + tag_size).min(buf.len());

    let mut offset = 10usize;
    while offset + 10 <= end {
        let id = &buf[offset..offset + 4];
        if id.iter().all(|b| *b == 0) {
            break; // padding
        }
        let declared = &buf[offset + 4..offset + 8];
        let frame_size = if major >= 4 {
            syncsafe_u32(declared) as usize
        } else {
            u32::from_be_bytes([declared[0], declared[1], declared[2], declared[3]]) as usize
        };
        let body_start = offset + 10;
        let Some(body_end) = body_start.checked_add(frame_size).filter(|e| *e <= end) else {
            debug!("truncated ID3v2 frame, stopping");
            break;
        };
        let payload = &buf[body_start..body_end];

        let key = match id {
            b"TIT2" => Some("Title"),
            b"TPE1" => Some("Artist"),
            b"TALB" => Some("Album"),
            b"TYER" | b"TDRC" => Some("RecordingDate"),
            b"TSSE" | b"TENC" => Some("Software"),
            _ => None,
        };
        if let Some(key) = key
            && !pairs.iter().any(|(k, _): &(String, String)| k == key)
            && let Some(text) = decode_text_frame(payload)
        {
            pairs.push((key.to_string(), text));
        }
        offset = body_end;
    }
    pairs
}

impl Default for AudioPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Preprocessor for AudioPreprocessor {
    fn name(&self) -> &str {
        "audio-metadata"
    }

    fn extensions(&self) -> &[&str] {
        &["m4a", "m4b", "mp3", "wav", "flac", "aac"]
    }

    fn mime_types(&self) -> &[&str] {
        &["audio/mp4", "audio/mpeg", "audio/wav", "audio/flac", "audio/aac"]
    }

    fn produces_body(&self) -> bool {
        false
    }

    fn produces_metadata(&self) -> bool {
        true
    }

    fn preprocessor_type(&self) -> Option<PreprocessorType> {
        Some(PreprocessorType::Audio)
    }

    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        ctx.deadline.check()?;
        let path = path.to_path_buf();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || Self::extract(&path, &ctx))
            .await
            .map_err(|err| crate::error::FerretError::parsing(format!("audio worker failed: {}", err)))?
    }
}
