//! Image metadata preprocessor (EXIF + XMP).
//!
//! Produces no body text; extracted fields are mapped to canonical keys so
//! the metadata validator sees a uniform vocabulary regardless of the camera
//! vendor's tag spelling.

use crate::error::Result;
use crate::preprocessors::gps::{Coordinates, dms_to_decimal};
use crate::preprocessors::{Preprocessor, ProcessingContext};
use crate::types::{MetadataItem, PreprocessorType, ProcessedContent};
use async_trait::async_trait;
use exif::{In, Tag, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use std::path::Path;

static XMP_CREATOR_TOOL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"xmp:CreatorTool(?:="([^"]+)"|>([^<]+)</)"#).expect("static pattern")
});
static XMP_CREATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<rdf:li[^>]*>([^<]+)</rdf:li>").expect("static pattern"));

/// Canonical EXIF string tags, in emission order.
const STRING_TAGS: &[(Tag, &str)] = &[
    (Tag::Make, "CameraMake"),
    (Tag::Model, "CameraModel"),
    (Tag::Software, "Software"),
    (Tag::Artist, "Artist"),
    (Tag::DateTime, "DateTime"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
    (Tag::BodySerialNumber, "SerialNumber"),
    (Tag::LensModel, "LensModel"),
];

/// EXIF and XMP field extractor for still images.
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self
    }

    fn extract(path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        let bytes = std::fs::read(path)?;
        ctx.deadline.check()?;

        let mut pairs: Vec<(String, String)> = Vec::new();

        if let Ok(exif) = exif::Reader::new().read_from_container(&mut Cursor::new(&bytes)) {
            if let Some(coords) = read_gps(&exif) {
                pairs.push(("GPS_Coordinates".to_string(), coords.canonical()));
            }
            for (tag, key) in STRING_TAGS {
                if let Some(field) = exif.get_field(*tag, In::PRIMARY) {
                    let value = field.display_value().to_string();
                    let value = value.trim_matches('"').trim().to_string();
                    if !value.is_empty() {
                        pairs.push((key.to_string(), value));
                    }
                }
            }
        }

        extract_xmp(&bytes, &mut pairs);

        let metadata_items = if pairs.is_empty() {
            Vec::new()
        } else {
            vec![MetadataItem::from_pairs(PreprocessorType::Image, "image", path, &pairs)]
        };

        let mut content = ProcessedContent::success(path, String::new(), metadata_items);
        if content.is_empty() {
            content.error = Some("no EXIF or XMP metadata present".to_string());
        }
        Ok(content)
    }
}

/// Decode the GPS IFD: degree-minute-second rationals plus hemisphere
/// references, with optional altitude.
fn read_gps(exif: &exif::Exif) -> Option<Coordinates> {
    let lat = rational_triple(exif, Tag::GPSLatitude)?;
    let lon = rational_triple(exif, Tag::GPSLongitude)?;
    let lat_ref = ascii_value(exif, Tag::GPSLatitudeRef).unwrap_or_else(|| "N".to_string());
    let lon_ref = ascii_value(exif, Tag::GPSLongitudeRef).unwrap_or_else(|| "E".to_string());

    let latitude = dms_to_decimal(lat.0, lat.1, lat.2, &lat_ref);
    let longitude = dms_to_decimal(lon.0, lon.1, lon.2, &lon_ref);

    let altitude = exif.get_field(Tag::GPSAltitude, In::PRIMARY).and_then(|field| match &field.value {
        Value::Rational(v) if !v.is_empty() => {
            let below_sea_level = matches!(
                exif.get_field(Tag::GPSAltitudeRef, In::PRIMARY).map(|f| &f.value),
                Some(Value::Byte(b)) if b.first() == Some(&1)
            );
            let alt = v[0].to_f64();
            Some(if below_sea_level { -alt } else { alt })
        }
        _ => None,
    });

    let coords = Coordinates {
        latitude,
        longitude,
        altitude,
    };
    coords.plausible().then_some(coords)
}

fn rational_triple(exif: &exif::Exif, tag: Tag) -> Option<(f64, f64, f64)> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) if v.len() >= 3 => Some((v[0].to_f64(), v[1].to_f64(), v[2].to_f64())),
        _ => None,
    }
}

fn ascii_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let value = field.display_value().to_string();
    let value = value.trim_matches('"').trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Mine the XMP packet, when present, for creator fields the EXIF IFDs do not
/// carry.
fn extract_xmp(bytes: &[u8], pairs: &mut Vec<(String, String)>) {
    let Some(start) = find_subslice(bytes, b"<x:xmpmeta") else {
        return;
    };
    let end = find_subslice(&bytes[start..], b"</x:xmpmeta>")
        .map(|offset| start + offset + b"</x:xmpmeta>".len())
        .unwrap_or(bytes.len().min(start + 64 * 1024));
    let packet = String::from_utf8_lossy(&bytes[start..end]);

    if !pairs.iter().any(|(k, _)| k == "Software")
        && let Some(caps) = XMP_CREATOR_TOOL.captures(&packet)
    {
        let value = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim());
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            pairs.push(("Software".to_string(), value.to_string()));
        }
    }
    if packet.contains("dc:creator")
        && !pairs.iter().any(|(k, _)| k == "Artist")
        && let Some(caps) = XMP_CREATOR.captures(&packet)
    {
        pairs.push(("Artist".to_string(), caps[1].trim().to_string()));
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Preprocessor for ImagePreprocessor {
    fn name(&self) -> &str {
        "image"
    }

    fn extensions(&self) -> &[&str] {
        &["jpg", "jpeg", "png", "tiff", "tif", "heic", "webp"]
    }

    fn mime_types(&self) -> &[&str] {
        &["image/jpeg", "image/png", "image/tiff", "image/heic", "image/webp"]
    }

    fn produces_body(&self) -> bool {
        false
    }

    fn produces_metadata(&self) -> bool {
        true
    }

    fn preprocessor_type(&self) -> Option<PreprocessorType> {
        Some(PreprocessorType::Image)
    }

    async fn process(&self, path: &Path, ctx: &ProcessingContext) -> Result<ProcessedContent> {
        ctx.deadline.check()?;
        let path = path.to_path_buf();
        let ctx = ctx.clone();
        tokio::task::spawn_blocking(move || Self::extract(&path, &ctx))
            .await
            .map_err(|err| crate::error::FerretError::parsing(format!("image worker failed: {}", err)))?
    }
}
