//! Extractor configuration
//!
//! All pipeline constants live here with their standard defaults. A JSON
//! file may override any subset of them.

use crate::utils::{MrzError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MRZ_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789<";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub engine: EngineConfig,
    pub preprocess: PreprocessConfig,
    pub region: RegionConfig,
}

impl ExtractorConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| MrzError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config: ExtractorConfig = serde_json::from_str(&raw)
            .map_err(|e| MrzError::Config(format!("Failed to parse {:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.preprocess;
        if p.threshold_block_size < 3 || p.threshold_block_size % 2 == 0 {
            return Err(MrzError::Config(format!(
                "threshold_block_size must be odd and at least 3, got {}",
                p.threshold_block_size
            )));
        }
        if p.kernel_width == 0 || p.kernel_height == 0 {
            return Err(MrzError::Config("morphology kernel must not be empty".to_string()));
        }
        if p.canny_low > p.canny_high {
            return Err(MrzError::Config("canny_low must not exceed canny_high".to_string()));
        }

        let r = &self.region;
        if !(r.min_aspect_ratio > 0.0 && r.min_aspect_ratio < r.max_aspect_ratio) {
            return Err(MrzError::Config(format!(
                "aspect ratio bounds ({}, {}) are not an interval",
                r.min_aspect_ratio, r.max_aspect_ratio
            )));
        }
        if r.horizontal_padding < 0.0 || r.vertical_padding < 0.0 {
            return Err(MrzError::Config("padding must not be negative".to_string()));
        }

        if self.engine.whitelist.is_empty() {
            return Err(MrzError::Config("character whitelist is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSegmentation {
    /// Automatic orientation and script detection plus layout analysis.
    AutoOsd,
    Auto,
    SingleBlock,
    SingleLine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tesseract data directory. `None` defers to `TESSDATA_PREFIX`.
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
    pub whitelist: String,
    pub page_segmentation: PageSegmentation,
    /// Upper bound for a single recognition call; `None` waits forever.
    pub timeout_ms: Option<u64>,
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: Some(PathBuf::from("./tessdata")),
            language: "eng+ocrb+mrz+osd".to_string(),
            whitelist: MRZ_WHITELIST.to_string(),
            page_segmentation: PageSegmentation::AutoOsd,
            timeout_ms: Some(30_000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub threshold_block_size: u32,
    pub threshold_offset: i32,
    /// Structuring element size, at most 511 on either side.
    pub kernel_width: u32,
    pub kernel_height: u32,
    /// Iterations of the closing and opening pass. The default of zero
    /// passes the image through unchanged.
    pub close_open_iterations: u32,
    pub erode_iterations: u32,
    pub dilate_iterations: u32,
    /// Median window radius. The default of zero is a 1x1 window and
    /// leaves the image unchanged.
    pub median_radius: u32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            threshold_block_size: 65,
            threshold_offset: 30,
            kernel_width: 25,
            kernel_height: 7,
            close_open_iterations: 0,
            erode_iterations: 2,
            dilate_iterations: 2,
            median_radius: 0,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateOrder {
    /// Order in which contour extraction reports the regions.
    Discovery,
    /// Largest area first, then top-to-bottom, then left-to-right.
    AreaDescending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub horizontal_padding: f64,
    pub vertical_padding: f64,
    pub candidate_order: CandidateOrder,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_aspect_ratio: 20.0,
            max_aspect_ratio: 55.0,
            horizontal_padding: 0.1,
            vertical_padding: 0.4,
            candidate_order: CandidateOrder::Discovery,
        }
    }
}
