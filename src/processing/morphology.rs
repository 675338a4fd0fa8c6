//! Grayscale morphology with a rectangular structuring element.
//!
//! Erosion takes the minimum and dilation the maximum over a `width` x
//! `height` window anchored at its center. Pixels outside the image do not
//! take part, so borders are never darkened or brightened artificially.

use crate::utils::{MrzError, Result};
use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

// Largest side `Mask::from_image` accepts.
const MAX_KERNEL_SIDE: u32 = 511;

/// Builds a solid `width` x `height` mask anchored at its center.
pub fn rect_mask(width: u32, height: u32) -> Result<Mask> {
    if width == 0 || height == 0 || width > MAX_KERNEL_SIDE || height > MAX_KERNEL_SIDE {
        return Err(MrzError::ImageProcessing(format!(
            "structuring element {}x{} must be between 1x1 and {}x{}",
            width, height, MAX_KERNEL_SIDE, MAX_KERNEL_SIDE
        )));
    }
    let solid = GrayImage::from_pixel(width, height, Luma([255u8]));
    Ok(Mask::from_image(&solid, (width / 2) as u8, (height / 2) as u8))
}

pub fn erode(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_erode(&out, mask);
    }
    out
}

pub fn dilate(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    let mut out = image.clone();
    for _ in 0..iterations {
        out = grayscale_dilate(&out, mask);
    }
    out
}

/// `iterations` dilations followed by as many erosions.
pub fn close(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    erode(&dilate(image, mask, iterations), mask, iterations)
}

/// `iterations` erosions followed by as many dilations.
pub fn open(image: &GrayImage, mask: &Mask, iterations: u32) -> GrayImage {
    dilate(&erode(image, mask, iterations), mask, iterations)
}
