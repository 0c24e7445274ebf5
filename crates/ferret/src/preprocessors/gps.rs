//! GPS coordinate normalization shared by the metadata preprocessors.
//!
//! Coordinates arrive in degree-minute-second EXIF rationals, plain decimal
//! pairs, ISO 6709 strings, or 16.16 fixed-point atom triples. All forms are
//! normalized to `"<lat>, <lon>[, <alt>]"` decimal degrees, sign encoding the
//! hemisphere.

/// A decoded coordinate pair with optional altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
}

impl Coordinates {
    /// Canonical decimal-degree rendering: six decimals for lat/lon, three
    /// for altitude.
    pub fn canonical(&self) -> String {
        match self.altitude {
            Some(alt) => format!("{:.6}, {:.6}, {:.3}", self.latitude, self.longitude, alt),
            None => format!("{:.6}, {:.6}", self.latitude, self.longitude),
        }
    }

    pub fn plausible(&self) -> bool {
        self.latitude.abs() <= 90.0 && self.longitude.abs() <= 180.0
    }
}

/// Convert a degree/minute/second triple plus hemisphere reference to signed
/// decimal degrees.
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64, reference: &str) -> f64 {
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    match reference.trim() {
        "S" | "s" | "W" | "w" => -value,
        _ => value,
    }
}

/// Decode an ISO 6709 string of the form `±DD.DDDD±DDD.DDDD[±AAA.AAA][/]`.
///
/// The second sign character splits latitude from longitude; an optional
/// third sign introduces the altitude.
pub fn parse_iso6709(raw: &str) -> Option<Coordinates> {
    let s = raw.trim().trim_end_matches('/');
    if s.len() < 3 {
        return None;
    }
    let bytes = s.as_bytes();
    if bytes[0] != b'+' && bytes[0] != b'-' {
        return None;
    }

    let mut signs = Vec::with_capacity(3);
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'+' || *b == b'-' {
            signs.push(i);
        }
    }
    if signs.len() < 2 {
        return None;
    }

    let lat: f64 = s[signs[0]..signs[1]].parse().ok()?;
    let (lon_end, altitude) = if signs.len() >= 3 {
        let alt: f64 = s[signs[2]..].parse().ok()?;
        (signs[2], Some(alt))
    } else {
        (s.len(), None)
    };
    let lon: f64 = s[signs[1]..lon_end].parse().ok()?;

    let coords = Coordinates {
        latitude: lat,
        longitude: lon,
        altitude,
    };
    coords.plausible().then_some(coords)
}
