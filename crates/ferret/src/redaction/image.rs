//! Image metadata redactor.
//!
//! Strips EXIF/XMP containers from JPEG and PNG files without decoding or
//! re-encoding pixel data: JPEG APP1 segments are dropped during a segment
//! walk, PNG metadata chunks during a chunk walk. Pixel payload bytes are
//! copied through untouched.

use crate::error::{FerretError, Result};
use std::path::Path;

/// PNG chunk types that carry metadata rather than pixels.
const PNG_METADATA_CHUNKS: &[&[u8; 4]] = &[b"tEXt", b"zTXt", b"iTXt", b"eXIf", b"tIME"];

/// Rewrite an image file with its metadata containers removed.
pub fn strip_image_metadata(path: &Path, input: &[u8]) -> Result<Vec<u8>> {
    if input.starts_with(&[0xFF, 0xD8]) {
        return strip_jpeg_app1(input);
    }
    if input.starts_with(b"\x89PNG\r\n\x1a\n") {
        return strip_png_chunks(input);
    }
    Err(FerretError::unsupported_format("image metadata rewrite supports JPEG and PNG").with_path(path))
}

/// Walk JPEG segments, dropping APP1 (EXIF and XMP both live there).
fn strip_jpeg_app1(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    out.extend_from_slice(&[0xFF, 0xD8]);

    let mut offset = 2usize;
    while offset + 4 <= input.len() {
        if input[offset] != 0xFF {
            // Entropy-coded data begins; copy the remainder verbatim.
            out.extend_from_slice(&input[offset..]);
            return Ok(out);
        }
        let marker = input[offset + 1];
        // Start-of-scan: everything from here on is pixel data.
        if marker == 0xDA {
            out.extend_from_slice(&input[offset..]);
            return Ok(out);
        }
        let length = u16::from_be_bytes([input[offset + 2], input[offset + 3]]) as usize;
        if length < 2 || offset + 2 + length > input.len() {
            return Err(FerretError::parsing("truncated JPEG segment"));
        }
        let segment_end = offset + 2 + length;
        if marker != 0xE1 {
            out.extend_from_slice(&input[offset..segment_end]);
        }
        offset = segment_end;
    }
    Ok(out)
}

/// Walk PNG chunks, dropping textual/EXIF metadata chunks.
fn strip_png_chunks(input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    out.extend_from_slice(&input[..8]);

    let mut offset = 8usize;
    while offset + 8 <= input.len() {
        let length = u32::from_be_bytes([input[offset], input[offset + 1], input[offset + 2], input[offset + 3]])
            as usize;
        let chunk_end = offset + 12 + length;
        if chunk_end > input.len() {
            return Err(FerretError::parsing("truncated PNG chunk"));
        }
        let chunk_type: [u8; 4] = input[offset + 4..offset + 8].try_into().expect("bounds checked");
        if !PNG_METADATA_CHUNKS.iter().any(|t| **t == chunk_type) {
            out.extend_from_slice(&input[offset..chunk_end]);
        }
        offset = chunk_end;
    }
    Ok(out)
}
