//! Bounds-checked MP4/MOV atom walker.
//!
//! Shared by the video and audio preprocessors (M4A uses the same container).
//! Atoms are length-type records: 4-byte big-endian size, 4-byte type tag.
//! `size == 1` switches to a 64-bit size in the following 8 bytes; `size == 0`
//! (box extends to end of file) is rejected as unsafe. Every multi-byte read
//! is checked against the declared box size and the remaining buffer; a
//! truncated or oversized box short-circuits with a recoverable error and
//! does not abort its sibling boxes.

use crate::error::{FerretError, Result};
use crate::preprocessors::Deadline;
use crate::preprocessors::gps::{Coordinates, parse_iso6709};
use tracing::debug;

/// Maximum bytes read from the file for metadata extraction.
pub const MAX_METADATA_READ: usize = 10 * 1024 * 1024;
/// Ceiling on any single declared box size.
pub const MAX_BOX_SIZE: u64 = 100 * 1024 * 1024;
/// Bytes of the file head scanned for Apple QuickTime metadata keys.
pub const HEAD_SWEEP_LIMIT: usize = 5 * 1024 * 1024;
/// Seconds between 1904-01-01T00:00:00Z (MP4 epoch) and the Unix epoch.
pub const MP4_EPOCH_OFFSET: i64 = 2_082_844_800;

const MAX_DEPTH: usize = 8;
const APPLE_KEY_PREFIX: &[u8] = b"com.apple.quicktime.";
const DEFAULT_KEYWORDS_KEY: &str = "com.apple.quicktime.keywords";

/// Property name carrying QuickTime keywords; overridable for vendors that
/// write a non-standard key.
fn keywords_key() -> String {
    std::env::var("APPLE_KEYWORDS_KEY")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_KEYWORDS_KEY.to_string())
}

/// Ordered key/value metadata accumulated during a walk.
#[derive(Debug, Default)]
pub struct AtomMetadata {
    pairs: Vec<(String, String)>,
}

impl AtomMetadata {
    pub fn push(&mut self, key: &str, value: String) {
        if !self.has(key) && !value.is_empty() {
            self.pairs.push((key.to_string(), value));
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug)]
struct RawBox<'a> {
    kind: [u8; 4],
    payload: &'a [u8],
    /// Offset of the byte after this box, which may lie past the buffer when
    /// the box body was not fully read.
    next: usize,
    /// Declared size exceeded the ceiling; the body is rejected but the
    /// sibling offset is still valid.
    oversized: bool,
}

fn be_u16(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

fn be_u32(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn be_u64(buf: &[u8], offset: usize) -> Option<u64> {
    buf.get(offset..offset + 8)
        .map(|b| u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
}

fn be_i32(buf: &[u8], offset: usize) -> Option<i32> {
    be_u32(buf, offset).map(|v| v as i32)
}

/// Parse one box header at `offset`.
///
/// Returns `Ok(None)` when fewer than a full header remains (end of walk).
fn parse_box(buf: &[u8], offset: usize) -> Result<Option<RawBox<'_>>> {
    if offset + 8 > buf.len() {
        return Ok(None);
    }
    let size32 = be_u32(buf, offset).expect("bounds checked") as u64;
    let mut kind = [0u8; 4];
    kind.copy_from_slice(&buf[offset + 4..offset + 8]);

    let (size, header_len) = match size32 {
        0 => {
            return Err(FerretError::parsing("box with size 0 (extends to EOF) rejected")
                .with_context("box_type", String::from_utf8_lossy(&kind).into_owned()));
        }
        1 => {
            let Some(size64) = be_u64(buf, offset + 8) else {
                return Err(FerretError::parsing("truncated 64-bit box header"));
            };
            if size64 < 16 {
                return Err(FerretError::parsing("64-bit box size below header length"));
            }
            (size64, 16usize)
        }
        s if s < 8 => {
            return Err(FerretError::parsing("box size below header length"));
        }
        s => (s, 8usize),
    };

    let next = (offset as u64).saturating_add(size).min(usize::MAX as u64) as usize;
    if size > MAX_BOX_SIZE {
        // Reject the body but keep the sibling offset so the walk continues.
        return Ok(Some(RawBox {
            kind,
            payload: &[],
            next,
            oversized: true,
        }));
    }

    let body_start = offset + header_len;
    let body_end = (offset as u64 + size).min(buf.len() as u64) as usize;
    let payload = if body_start <= body_end { &buf[body_start..body_end] } else { &[][..] };
    Ok(Some(RawBox {
        kind,
        payload,
        next,
        oversized: false,
    }))
}

/// Walk the children of `buf`, dispatching atoms of interest into `out`.
fn walk(buf: &[u8], depth: usize, deadline: &Deadline, out: &mut AtomMetadata) -> Result<()> {
    if depth > MAX_DEPTH {
        return Ok(());
    }
    let mut offset = 0usize;
    while offset < buf.len() {
        deadline.check()?;
        let parsed = match parse_box(buf, offset) {
            Ok(Some(b)) => b,
            Ok(None) => break,
            Err(err) => {
                // Without a trustworthy size there is no next sibling offset.
                debug!(error = %err, "stopping atom walk");
                break;
            }
        };

        if parsed.oversized {
            debug!(box_type = %String::from_utf8_lossy(&parsed.kind), "skipping box over the 100 MiB ceiling");
        } else if let Err(err) = dispatch(&parsed, depth, deadline, out) {
            if err.kind() == crate::error::ErrorKind::Timeout {
                return Err(err);
            }
            debug!(box_type = %String::from_utf8_lossy(&parsed.kind), error = %err, "skipping corrupted atom");
        }

        if parsed.next <= offset {
            break;
        }
        offset = parsed.next;
    }
    Ok(())
}

fn dispatch(raw: &RawBox<'_>, depth: usize, deadline: &Deadline, out: &mut AtomMetadata) -> Result<()> {
    match &raw.kind {
        b"ftyp" => parse_ftyp(raw.payload, out),
        b"moov" | b"udta" => walk(raw.payload, depth + 1, deadline, out)?,
        b"mvhd" => parse_mvhd(raw.payload, out)?,
        b"meta" => {
            // meta carries a 4-byte version/flags word before its children.
            if raw.payload.len() > 4 {
                walk(&raw.payload[4..], depth + 1, deadline, out)?;
            }
        }
        b"ilst" => parse_ilst(raw.payload, deadline, out)?,
        kind if kind[0] == 0xA9 => parse_udta_tag(kind, raw.payload, out),
        _ => {}
    }
    Ok(())
}

fn parse_ftyp(payload: &[u8], out: &mut AtomMetadata) {
    let Some(brand) = payload.get(..4) else {
        return;
    };
    let brand_str = String::from_utf8_lossy(brand).trim().to_string();
    let family = match brand {
        b"qt  " => "QuickTime",
        b"isom" | b"iso2" | b"mp41" | b"mp42" | b"avc1" => "MP4",
        b"M4A " | b"M4B " => "MPEG-4 audio",
        _ => "",
    };
    if family.is_empty() {
        out.push("ContainerBrand", brand_str);
    } else {
        out.push("ContainerBrand", format!("{} ({})", family, brand_str));
    }
}

/// Movie header: time scale + duration give the wall-clock duration, creation
/// time is shifted from the 1904 epoch.
fn parse_mvhd(payload: &[u8], out: &mut AtomMetadata) -> Result<()> {
    let version = *payload
        .first()
        .ok_or_else(|| FerretError::parsing("empty mvhd box"))?;
    let (creation, timescale, duration) = match version {
        0 => {
            let creation = be_u32(payload, 4).ok_or_else(|| FerretError::parsing("truncated mvhd v0"))? as u64;
            let timescale = be_u32(payload, 12).ok_or_else(|| FerretError::parsing("truncated mvhd v0"))?;
            let duration = be_u32(payload, 16).ok_or_else(|| FerretError::parsing("truncated mvhd v0"))? as u64;
            (creation, timescale, duration)
        }
        1 => {
            let creation = be_u64(payload, 4).ok_or_else(|| FerretError::parsing("truncated mvhd v1"))?;
            let timescale = be_u32(payload, 20).ok_or_else(|| FerretError::parsing("truncated mvhd v1"))?;
            let duration = be_u64(payload, 24).ok_or_else(|| FerretError::parsing("truncated mvhd v1"))?;
            (creation, timescale, duration)
        }
        v => {
            return Err(FerretError::parsing(format!("unknown mvhd version {}", v)));
        }
    };

    if timescale > 0 && duration > 0 {
        out.push("Duration", format!("{:.3} s", duration as f64 / timescale as f64));
    }
    if creation > 0 {
        let unix = creation as i64 - MP4_EPOCH_OFFSET;
        if let Some(ts) = chrono::DateTime::from_timestamp(unix, 0) {
            out.push("CreationTime", ts.to_rfc3339());
        }
    }
    Ok(())
}

/// One `©`-prefixed user-data tag.
fn parse_udta_tag(kind: &[u8; 4], payload: &[u8], out: &mut AtomMetadata) {
    let key = match &kind[1..4] {
        b"nam" => "Title",
        b"ART" => "Artist",
        b"alb" => "Album",
        b"day" => "CreationDate",
        b"mak" => "CameraMake",
        b"mod" => "CameraModel",
        b"swr" => "Software",
        b"too" => "Software",
        b"cmt" => "Comment",
        b"xyz" => {
            parse_xyz(payload, out);
            return;
        }
        [b'e', b'd', d @ b'1'..=b'9'] => {
            let key = format!("EditDate{}", *d as char);
            if let Some(text) = decode_tag_text(payload) {
                out.push(&key, text);
            }
            return;
        }
        _ => return,
    };
    if let Some(text) = decode_tag_text(payload) {
        out.push(key, text);
    }
}

/// `©xyz` carries GPS either as international text (usually ISO 6709) or as
/// three 16.16 fixed-point big-endian signed integers.
fn parse_xyz(payload: &[u8], out: &mut AtomMetadata) {
    if let Some(text) = decode_tag_text(payload) {
        if let Some(coords) = parse_iso6709(&text) {
            out.push("GPS_Coordinates", coords.canonical());
        }
        return;
    }
    if payload.len() >= 12 {
        let (Some(lat), Some(lon), Some(alt)) = (be_i32(payload, 0), be_i32(payload, 4), be_i32(payload, 8)) else {
            return;
        };
        let coords = Coordinates {
            latitude: round_to(lat as f64 / 65536.0, 4),
            longitude: round_to(lon as f64 / 65536.0, 4),
            altitude: Some(round_to(alt as f64 / 65536.0, 3)),
        };
        if coords.plausible() {
            out.push("GPS_Coordinates", coords.canonical());
        }
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Decode a tag payload as either QuickTime international text (u16 size +
/// u16 language + bytes) or an iTunes-style `data` child atom.
fn decode_tag_text(payload: &[u8]) -> Option<String> {
    // International text: declared size must account for the remaining bytes.
    if payload.len() >= 4
        && let Some(size) = be_u16(payload, 0)
        && 4 + size as usize <= payload.len()
        && size > 0
    {
        let text = String::from_utf8_lossy(&payload[4..4 + size as usize]);
        let text = text.trim_matches(char::from(0)).trim().to_string();
        if !text.is_empty() {
            return Some(text);
        }
    }
    decode_data_atom(payload)
}

/// An iTunes `data` atom: box header, 4-byte type indicator, 4-byte locale,
/// then the value bytes.
fn decode_data_atom(payload: &[u8]) -> Option<String> {
    let size = be_u32(payload, 0)? as usize;
    if payload.get(4..8)? != b"data" || size < 16 || size > payload.len() {
        return None;
    }
    let value = &payload[16..size];
    let text = String::from_utf8_lossy(value).trim_matches(char::from(0)).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// iTunes-style tag list under `meta.ilst`.
fn parse_ilst(payload: &[u8], deadline: &Deadline, out: &mut AtomMetadata) -> Result<()> {
    let mut offset = 0usize;
    while offset < payload.len() {
        deadline.check()?;
        let item = match parse_box(payload, offset) {
            Ok(Some(b)) => b,
            Ok(None) => break,
            Err(_) => break,
        };
        if item.kind[0] == 0xA9 {
            parse_udta_tag(&item.kind, item.payload, out);
        }
        if item.next <= offset {
            break;
        }
        offset = item.next;
    }
    Ok(())
}

/// Corruption heuristic for sweep candidates: mostly printable, no NUL /
/// 0xFF / `*data` patterns, not a single repeated character.
fn plausible_value(window: &[u8], candidate: &str) -> bool {
    if candidate.len() < 4 {
        return false;
    }
    if candidate.contains("*data") {
        return false;
    }
    let mut chars = candidate.chars();
    let first = chars.next().unwrap_or_default();
    if chars.all(|c| c == first) {
        return false;
    }
    if window.contains(&0) || window.contains(&0xFF) {
        return false;
    }
    let printable = window.iter().filter(|b| (0x20..0x7F).contains(*b)).count();
    printable * 10 >= window.len() * 7
}

fn printable_run(buf: &[u8], start: usize) -> &[u8] {
    let end = buf[start..]
        .iter()
        .position(|b| !(0x20..0x7F).contains(b))
        .map(|p| start + p)
        .unwrap_or(buf.len());
    &buf[start..end]
}

/// Secondary sweep over the file head for `com.apple.quicktime.*` keys.
///
/// The structured walk wins: sweep values are only recorded for keys the walk
/// did not populate.
fn sweep_apple_keys(buf: &[u8], deadline: &Deadline, out: &mut AtomMetadata) -> Result<()> {
    let head = &buf[..buf.len().min(HEAD_SWEEP_LIMIT)];
    let keywords = keywords_key();

    let mut offset = 0usize;
    while let Some(found) = find_subslice(&head[offset..], APPLE_KEY_PREFIX) {
        deadline.check()?;
        let key_start = offset + found;
        let key_bytes = printable_run(head, key_start);
        let key = String::from_utf8_lossy(key_bytes).into_owned();
        let value_search_start = key_start + key_bytes.len();
        offset = value_search_start.max(key_start + 1);

        let canonical = if key == keywords {
            Some("Keywords")
        } else {
            match key.strip_prefix("com.apple.quicktime.") {
                Some("location.ISO6709") => Some("GPS_Coordinates"),
                Some("make") => Some("CameraMake"),
                Some("model") => Some("CameraModel"),
                Some("software") => Some("Software"),
                Some("creationdate") => Some("CreationDate"),
                Some("author") => Some("Author"),
                Some("displayname") => Some("DisplayName"),
                _ => None,
            }
        };
        let Some(canonical) = canonical else {
            continue;
        };
        if out.has(canonical) {
            continue;
        }

        // Value: next printable ASCII run of >= 4 chars within a short window
        // after the key, validated against the corruption heuristic.
        let window_end = (value_search_start + 256).min(head.len());
        let window = &head[value_search_start..window_end];
        let mut pos = 0usize;
        while pos < window.len() {
            if (0x20..0x7F).contains(&window[pos]) {
                let run = printable_run(window, pos);
                let candidate = String::from_utf8_lossy(run).trim().to_string();
                if plausible_value(run, &candidate) {
                    if canonical == "GPS_Coordinates" {
                        if let Some(coords) = parse_iso6709(&candidate) {
                            out.push(canonical, coords.canonical());
                            break;
                        }
                    } else {
                        out.push(canonical, candidate);
                        break;
                    }
                }
                pos += run.len().max(1);
            } else {
                pos += 1;
            }
        }
    }
    Ok(())
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Extract metadata pairs from an MP4-family buffer.
///
/// `buf` is at most [`MAX_METADATA_READ`] bytes of the file head. The
/// structured atom walk runs first, then the Apple key sweep fills the gaps.
/// Always returns the (possibly partial) result unless the deadline expires.
pub fn extract_atom_metadata(buf: &[u8], deadline: &Deadline) -> Result<Vec<(String, String)>> {
    let mut out = AtomMetadata::default();
    walk(buf, 0, deadline, &mut out)?;
    sweep_apple_keys(buf, deadline, &mut out)?;
    Ok(out.into_pairs())
}
