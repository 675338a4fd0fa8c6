use image::DynamicImage;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref MRZ_LINE: Regex = Regex::new(r"^[A-Z0-9<]{44}$").unwrap();
}

/// Axis-aligned rectangle hypothesized to hold the MRZ band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CandidateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CandidateRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        CandidateRegion {
            x,
            y,
            width,
            height,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Grows the rectangle by a fraction of its own size on each side and
    /// clamps the result to a `bounds_width` x `bounds_height` image.
    pub fn padded(
        &self,
        horizontal: f64,
        vertical: f64,
        bounds_width: u32,
        bounds_height: u32,
    ) -> CandidateRegion {
        let pad_x = (self.width as f64 * horizontal) as u32;
        let pad_y = (self.height as f64 * vertical) as u32;

        let x = self.x.saturating_sub(pad_x).min(bounds_width.saturating_sub(1));
        let y = self.y.saturating_sub(pad_y).min(bounds_height.saturating_sub(1));
        let width = (self.width + 2 * pad_x).min(bounds_width - x).max(1);
        let height = (self.height + 2 * pad_y).min(bounds_height - y).max(1);

        CandidateRegion {
            x,
            y,
            width,
            height,
        }
    }

    pub fn fits_within(&self, bounds_width: u32, bounds_height: u32) -> bool {
        self.x as u64 + self.width as u64 <= bounds_width as u64
            && self.y as u64 + self.height as u64 <= bounds_height as u64
    }
}

impl fmt::Display for CandidateRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// A recognized line matching the TD3 MRZ line format: 44 characters
/// from `[A-Z0-9<]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrzLine(String);

impl MrzLine {
    pub const LENGTH: usize = 44;

    pub fn parse(line: &str) -> Option<Self> {
        if MRZ_LINE.is_match(line) {
            Some(MrzLine(line.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The 24 characters of the second MRZ line that feed BAC key derivation:
/// document number, date of birth and date of expiry, each followed by
/// its check digit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub const LENGTH: usize = 24;

    /// Accepts exactly 24 MRZ characters that do not contain `P<`.
    pub fn new(value: String) -> Option<Self> {
        let valid_chars = value
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'<');
        if value.len() == Self::LENGTH && valid_chars && !value.contains("P<") {
            Some(KeyMaterial(value))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn document_number(&self) -> &str {
        &self.0[0..10]
    }

    pub fn date_of_birth(&self) -> &str {
        &self.0[10..17]
    }

    pub fn date_of_expiry(&self) -> &str {
        &self.0[17..24]
    }
}

impl fmt::Display for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-fatal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Found(KeyMaterial),
    NotFound,
}

impl Extraction {
    pub fn key_material(&self) -> Option<&KeyMaterial> {
        match self {
            Extraction::Found(key) => Some(key),
            Extraction::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Extraction::Found(_))
    }

    /// The empty-string contract: the key, or `""` when nothing was found.
    pub fn into_sentinel(self) -> String {
        match self {
            Extraction::Found(key) => key.0,
            Extraction::NotFound => String::new(),
        }
    }
}

/// Image chosen by the region validator for the full recognition pass.
#[derive(Debug, Clone)]
pub enum RegionSelection {
    Candidate {
        index: usize,
        region: CandidateRegion,
        image: DynamicImage,
    },
    FullImage(DynamicImage),
}

impl RegionSelection {
    pub fn image(&self) -> &DynamicImage {
        match self {
            RegionSelection::Candidate { image, .. } => image,
            RegionSelection::FullImage(image) => image,
        }
    }

    pub fn region(&self) -> Option<CandidateRegion> {
        match self {
            RegionSelection::Candidate { region, .. } => Some(*region),
            RegionSelection::FullImage(_) => None,
        }
    }
}
