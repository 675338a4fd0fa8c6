use crate::config::{CandidateOrder, RegionConfig};
use crate::models::{CandidateRegion, MrzLine, RegionSelection};
use crate::processing::debug::{DebugSink, DebugStage};
use crate::processing::image::ImageProcessor;
use crate::processing::ocr::RecognitionEngine;
use crate::utils::Result;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, Contour};
use log::{debug, info};

/// Locates rectangles shaped like a single MRZ line in an edge map.
pub struct RegionFinder {
    config: RegionConfig,
}

impl RegionFinder {
    pub fn new(config: RegionConfig) -> Self {
        RegionFinder { config }
    }

    /// Bounding boxes of the outermost contours whose aspect ratio lies
    /// strictly inside the configured interval.
    pub fn find_candidates(&self, edges: &GrayImage) -> Vec<CandidateRegion> {
        let contours = find_contours::<u32>(edges);
        let outermost = contours.iter().filter(|c| c.parent.is_none()).count();

        let mut candidates: Vec<CandidateRegion> = contours
            .iter()
            .filter(|c| c.parent.is_none())
            .filter_map(bounding_rect)
            .filter(|rect| {
                let ratio = rect.aspect_ratio();
                ratio > self.config.min_aspect_ratio && ratio < self.config.max_aspect_ratio
            })
            .collect();

        if self.config.candidate_order == CandidateOrder::AreaDescending {
            candidates.sort_by(|a, b| {
                b.area()
                    .cmp(&a.area())
                    .then(a.y.cmp(&b.y))
                    .then(a.x.cmp(&b.x))
            });
        }

        debug!(
            "{} outer contours, {} MRZ-shaped candidates",
            outermost,
            candidates.len()
        );
        candidates
    }
}

fn bounding_rect(contour: &Contour<u32>) -> Option<CandidateRegion> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(CandidateRegion::new(
        min_x,
        min_y,
        max_x - min_x + 1,
        max_y - min_y + 1,
    ))
}

/// Quick check on a candidate crop: with newlines and spaces removed the
/// text must be one MRZ line's worth of characters and must not be the
/// first (`P<`) line.
pub fn looks_like_mrz_line(text: &str) -> bool {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | ' '))
        .collect();
    !cleaned.contains("P<") && cleaned.chars().count() == MrzLine::LENGTH
}

/// Picks the first candidate whose crop reads like an MRZ line.
pub struct RegionValidator<'a> {
    engine: &'a RecognitionEngine,
    config: &'a RegionConfig,
}

impl<'a> RegionValidator<'a> {
    pub fn new(engine: &'a RecognitionEngine, config: &'a RegionConfig) -> Self {
        RegionValidator { engine, config }
    }

    /// Falls back to the whole `original` image when no candidate passes.
    /// Recognition failures abort the selection.
    pub fn select(
        &self,
        original: &DynamicImage,
        candidates: &[CandidateRegion],
        sink: Option<&dyn DebugSink>,
    ) -> Result<RegionSelection> {
        let (width, height) = (original.width(), original.height());

        for (index, candidate) in candidates.iter().enumerate() {
            let region = candidate.padded(
                self.config.horizontal_padding,
                self.config.vertical_padding,
                width,
                height,
            );
            let crop = ImageProcessor::crop(original, &region);
            if let Some(sink) = sink {
                sink.record(DebugStage::Candidate(index), &crop);
            }

            let text = self.engine.recognize(&crop)?;
            debug!("Candidate {} ({}) reads {:?}", index, region, text);

            if looks_like_mrz_line(&text) {
                info!("MRZ region found at candidate {} ({})", index, region);
                return Ok(RegionSelection::Candidate {
                    index,
                    region,
                    image: crop,
                });
            }
        }

        info!(
            "None of {} candidates reads as MRZ, using full image",
            candidates.len()
        );
        Ok(RegionSelection::FullImage(original.clone()))
    }
}
