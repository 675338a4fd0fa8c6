//! Optional instrumentation hook for intermediate pipeline images.

use crate::utils::Result;
use image::DynamicImage;
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStage {
    Original,
    Thresholded,
    Normalized,
    Morphed,
    Eroded,
    Dilated,
    Blurred,
    Edges,
    Candidate(usize),
    Selected,
}

impl fmt::Display for DebugStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DebugStage::Original => f.write_str("original"),
            DebugStage::Thresholded => f.write_str("thresholded"),
            DebugStage::Normalized => f.write_str("normalized"),
            DebugStage::Morphed => f.write_str("morphed"),
            DebugStage::Eroded => f.write_str("eroded"),
            DebugStage::Dilated => f.write_str("dilated"),
            DebugStage::Blurred => f.write_str("blurred"),
            DebugStage::Edges => f.write_str("edges"),
            DebugStage::Candidate(index) => write!(f, "candidate_{:02}", index),
            DebugStage::Selected => f.write_str("selected"),
        }
    }
}

/// Receives intermediate images. Implementations must not fail the
/// pipeline; write errors are theirs to report.
pub trait DebugSink: Send + Sync {
    fn record(&self, stage: DebugStage, image: &DynamicImage);
}

impl<F> DebugSink for F
where
    F: Fn(DebugStage, &DynamicImage) + Send + Sync,
{
    fn record(&self, stage: DebugStage, image: &DynamicImage) {
        self(stage, image)
    }
}

/// Writes every stage as `<stage>.png` into one directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(DirectorySink { dir })
    }

    /// A fresh directory under the system temp dir that outlives the sink.
    pub fn in_temp_dir() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("mrz-debug-").tempdir()?;
        Ok(DirectorySink {
            dir: dir.into_path(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DebugSink for DirectorySink {
    fn record(&self, stage: DebugStage, image: &DynamicImage) {
        let path = self.dir.join(format!("{}.png", stage));
        match image.save(&path) {
            Ok(()) => debug!("Saved {} image to {:?}", stage, path),
            Err(e) => warn!("Could not save {} image to {:?}: {}", stage, path, e),
        }
    }
}
