use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, Luma};

use crate::error::ProcessError;
use crate::processor::{PreparedImage, Preprocessor};

/// Upscales narrow scans, then produces a binarized grayscale copy for OCR.
pub struct ImagePreprocessor {
    min_width: u32,
    contrast: f32,
}

impl ImagePreprocessor {
    pub fn new(min_width: u32, contrast: f32) -> Self {
        Self {
            min_width,
            contrast,
        }
    }

    fn upscale(&self, img: DynamicImage) -> DynamicImage {
        let (width, height) = img.dimensions();
        if self.min_width == 0 || width >= self.min_width {
            return img;
        }
        let scaled_height =
            ((height as u64 * self.min_width as u64) / width as u64).max(1) as u32;
        img.resize_exact(self.min_width, scaled_height, FilterType::CatmullRom)
    }

    fn normalize(&self, img: &DynamicImage) -> GrayImage {
        let gray = img.to_luma8();
        let blurred = imageops::blur(&gray, 1.0);
        let contrasted = imageops::contrast(&blurred, self.contrast);
        binarize(&contrasted)
    }
}

impl Preprocessor for ImagePreprocessor {
    fn preprocess(&self, path: &Path) -> Result<PreparedImage, ProcessError> {
        let _span = tracing::info_span!("processor.preprocess").entered();

        if !path.exists() {
            return Err(ProcessError::MissingSource(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|e| ProcessError::ReadSource {
            path: path.to_path_buf(),
            source: e,
        })?;

        let decoded = image::load_from_memory(&bytes).map_err(|e| {
            ProcessError::ImageProcessing(format!("Failed to decode {}: {}", path.display(), e))
        })?;

        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ProcessError::Preprocessing(format!(
                "Image {} has no pixels",
                path.display()
            )));
        }

        let original = self.upscale(decoded);
        let normalized = DynamicImage::ImageLuma8(self.normalize(&original));

        Ok(PreparedImage {
            original,
            normalized,
        })
    }
}

/// Global threshold at mean luminance: darker pixels become black text,
/// the rest white background.
fn binarize(gray: &GrayImage) -> GrayImage {
    let pixel_count = (gray.width() as u64 * gray.height() as u64).max(1);
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = (sum / pixel_count) as u8;

    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] < mean {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}
