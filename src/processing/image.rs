use crate::utils::{MrzError, Result};
use image::DynamicImage;
use log::debug;
use std::path::Path;

pub struct ImageProcessor;

impl ImageProcessor {
    /// Decodes the image at `image_path`. Missing, corrupt and zero-sized
    /// images are load errors.
    pub fn load(image_path: &Path) -> Result<DynamicImage> {
        let img = image::open(image_path).map_err(|e| MrzError::load(image_path, e))?;

        if img.width() == 0 || img.height() == 0 {
            return Err(MrzError::load(image_path, "image has no pixels"));
        }

        debug!(
            "Loaded {:?}: {}x{}, {} channel(s)",
            image_path,
            img.width(),
            img.height(),
            img.color().channel_count()
        );
        Ok(img)
    }

    /// Cuts `region` out of `img`. The region must already fit inside it.
    pub fn crop(img: &DynamicImage, region: &crate::models::CandidateRegion) -> DynamicImage {
        img.crop_imm(region.x, region.y, region.width, region.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CandidateRegion;
    use image::{GrayImage, Luma};
    use std::io::Write;

    #[test]
    fn test_missing_file_is_load_error() {
        let err = ImageProcessor::load(Path::new("/nonexistent/passport.jpg")).unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn test_corrupt_file_is_load_error() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"definitely not a png").unwrap();
        let err = ImageProcessor::load(file.path()).unwrap_err();
        assert!(err.is_load_error());
    }

    #[test]
    fn test_load_reports_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        GrayImage::from_pixel(40, 20, Luma([200u8])).save(&path).unwrap();

        let img = ImageProcessor::load(&path).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));
    }

    #[test]
    fn test_crop_matches_region() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(100, 50));
        let crop = ImageProcessor::crop(&img, &CandidateRegion::new(10, 5, 30, 8));
        assert_eq!((crop.width(), crop.height()), (30, 8));
    }
}
