use crate::models::Extraction;
use crate::mrz_extractor::MrzExtractor;
use crate::utils::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

/// Per-file outcome of a batch run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub path: PathBuf,
    pub key_material: Option<String>,
    pub error: Option<String>,
}

impl BatchReport {
    pub fn new(path: PathBuf, result: Result<Extraction>) -> Self {
        match result {
            Ok(extraction) => BatchReport {
                path,
                key_material: extraction.key_material().map(|k| k.to_string()),
                error: None,
            },
            Err(e) => BatchReport {
                path,
                key_material: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Image files directly inside `directory`, sorted by name.
pub fn collect_images<P: AsRef<Path>>(directory: P) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = fs::read_dir(directory.as_ref())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    images.sort();
    Ok(images)
}

/// Extracts every image in `directory`. A failing file is reported and
/// does not stop the batch.
pub fn process_directory<P: AsRef<Path>>(
    extractor: &MrzExtractor,
    directory: P,
) -> Result<Vec<BatchReport>> {
    let images = collect_images(directory)?;
    Ok(images
        .into_iter()
        .map(|path| {
            let result = extractor.extract(&path);
            BatchReport::new(path, result)
        })
        .collect())
}
