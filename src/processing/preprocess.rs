use crate::config::PreprocessConfig;
use crate::processing::debug::{DebugSink, DebugStage};
use crate::processing::morphology;
use crate::utils::Result;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::{gaussian_blur_f32, median_filter};
use imageproc::morphology::Mask;
use log::debug;

/// Turns a document photo into an edge map in which dense text bands
/// become closed outlines.
pub struct Preprocessor {
    config: PreprocessConfig,
    mask: Mask,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Result<Self> {
        let mask = morphology::rect_mask(config.kernel_width, config.kernel_height)?;
        Ok(Preprocessor { config, mask })
    }

    pub fn run(&self, img: &DynamicImage, sink: Option<&dyn DebugSink>) -> GrayImage {
        let c = &self.config;
        let mask = &self.mask;

        if let Some(sink) = sink {
            sink.record(DebugStage::Original, img);
        }

        let gray = img.to_luma8();

        let binary = adaptive_gaussian_threshold(&gray, c.threshold_block_size, c.threshold_offset);
        emit(sink, DebugStage::Thresholded, &binary);

        let normalized = normalize_min_max(&binary);
        emit(sink, DebugStage::Normalized, &normalized);

        let closed = morphology::close(&normalized, mask, c.close_open_iterations);
        let morphed = morphology::open(&closed, mask, c.close_open_iterations);
        emit(sink, DebugStage::Morphed, &morphed);

        let eroded = morphology::erode(&morphed, mask, c.erode_iterations);
        emit(sink, DebugStage::Eroded, &eroded);

        let dilated = morphology::dilate(&eroded, mask, c.dilate_iterations);
        emit(sink, DebugStage::Dilated, &dilated);

        let blurred = if c.median_radius == 0 {
            dilated
        } else {
            median_filter(&dilated, c.median_radius, c.median_radius)
        };
        emit(sink, DebugStage::Blurred, &blurred);

        let edges = canny(&blurred, c.canny_low, c.canny_high);
        emit(sink, DebugStage::Edges, &edges);

        debug!(
            "Preprocessed {}x{} image into edge map",
            edges.width(),
            edges.height()
        );
        edges
    }
}

fn emit(sink: Option<&dyn DebugSink>, stage: DebugStage, img: &GrayImage) {
    if let Some(sink) = sink {
        sink.record(stage, &DynamicImage::ImageLuma8(img.clone()));
    }
}

/// Binarizes against a Gaussian-weighted local mean: a pixel turns white
/// when it is brighter than the mean of its `block_size` neighborhood
/// minus `offset`, black otherwise.
pub fn adaptive_gaussian_threshold(gray: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    // Sigma a Gaussian kernel of `block_size` taps gets when none is given.
    let sigma = 0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let local_mean = gaussian_blur_f32(gray, sigma);

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let threshold = local_mean.get_pixel(x, y)[0] as i32 - offset;
        let value = if pixel[0] as i32 > threshold { 255 } else { 0 };
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

/// Stretches intensities linearly so the darkest pixel maps to 0 and the
/// brightest to 255. A flat image has no range to stretch and maps to 0.
pub fn normalize_min_max(img: &GrayImage) -> GrayImage {
    let (min, max) = img
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    let mut out = GrayImage::new(img.width(), img.height());
    if max <= min {
        return out;
    }

    let scale = 255.0 / (max - min) as f32;
    for (x, y, pixel) in img.enumerate_pixels() {
        let value = ((pixel[0] - min) as f32 * scale).round() as u8;
        out.put_pixel(x, y, Luma([value]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use std::sync::Mutex;

    fn document_with_band() -> DynamicImage {
        let mut page = RgbImage::from_pixel(400, 200, image::Rgb([230, 230, 230]));
        draw_filled_rect_mut(
            &mut page,
            Rect::at(40, 150).of_size(320, 12),
            image::Rgb([20, 20, 20]),
        );
        DynamicImage::ImageRgb8(page)
    }

    #[test]
    fn test_threshold_is_binary() {
        let gray = document_with_band().to_luma8();
        let binary = adaptive_gaussian_threshold(&gray, 65, 30);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
        // Flat background stays white, the dark band turns black.
        assert_eq!(binary.get_pixel(10, 10)[0], 255);
        assert_eq!(binary.get_pixel(200, 152)[0], 0);
    }

    #[test]
    fn test_normalize_stretches_range() {
        let mut img = GrayImage::from_pixel(4, 1, Luma([100]));
        img.put_pixel(0, 0, Luma([50]));
        img.put_pixel(3, 0, Luma([150]));
        let out = normalize_min_max(&img);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(1, 0)[0], 128);
        assert_eq!(out.get_pixel(3, 0)[0], 255);
    }

    #[test]
    fn test_normalize_flat_image() {
        let img = GrayImage::from_pixel(3, 3, Luma([255]));
        assert!(normalize_min_max(&img).pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn test_run_keeps_dimensions_and_records_every_stage() {
        let stages = Mutex::new(Vec::new());
        let sink = |stage: DebugStage, _: &DynamicImage| stages.lock().unwrap().push(stage);

        let edges = Preprocessor::new(PreprocessConfig::default())
            .unwrap()
            .run(&document_with_band(), Some(&sink));

        assert_eq!(edges.dimensions(), (400, 200));
        assert_eq!(
            *stages.lock().unwrap(),
            vec![
                DebugStage::Original,
                DebugStage::Thresholded,
                DebugStage::Normalized,
                DebugStage::Morphed,
                DebugStage::Eroded,
                DebugStage::Dilated,
                DebugStage::Blurred,
                DebugStage::Edges,
            ]
        );
    }

    #[test]
    fn test_default_median_leaves_image_unchanged() {
        let stages = Mutex::new(Vec::new());
        let sink = |stage: DebugStage, img: &DynamicImage| {
            if matches!(stage, DebugStage::Dilated | DebugStage::Blurred) {
                stages.lock().unwrap().push(img.clone());
            }
        };

        Preprocessor::new(PreprocessConfig::default())
            .unwrap()
            .run(&document_with_band(), Some(&sink));

        let stages = stages.lock().unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0], stages[1]);
    }

    #[test]
    fn test_oversized_kernel_is_processing_error() {
        let config = PreprocessConfig {
            kernel_width: 1024,
            ..PreprocessConfig::default()
        };
        assert!(matches!(
            Preprocessor::new(config),
            Err(crate::utils::MrzError::ImageProcessing(_))
        ));
    }

    #[test]
    fn test_run_is_deterministic() {
        let pre = Preprocessor::new(PreprocessConfig::default()).unwrap();
        let img = document_with_band();
        assert_eq!(pre.run(&img, None), pre.run(&img, None));
    }
}
