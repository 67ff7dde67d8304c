use std::path::{Path, PathBuf};

use image::{DynamicImage, GenericImageView};

use crate::error::ProcessError;
use crate::processor::{DetectedFigure, FigureDetector};

/// Detector used when no figure-detection backend is configured.
pub struct NoFigureDetector;

impl FigureDetector for NoFigureDetector {
    fn detect_figures(
        &self,
        _normalized: &DynamicImage,
        _original: &DynamicImage,
    ) -> Result<Vec<DetectedFigure>, ProcessError> {
        Ok(Vec::new())
    }
}

/// Crops `figure.region` (clamped to the image) out of `original` and saves
/// it as a PNG. Returns `None` for an empty crop or a failed write.
pub fn save_figure_crop(
    original: &DynamicImage,
    figure: &DetectedFigure,
    dir: &Path,
    basename: &str,
    index: usize,
) -> Option<PathBuf> {
    let (img_width, img_height) = original.dimensions();
    let region = figure.region;
    if region.x >= img_width || region.y >= img_height {
        tracing::warn!(
            x = region.x,
            y = region.y,
            "Figure region outside image bounds, skipping"
        );
        return None;
    }

    let width = region.width.min(img_width - region.x);
    let height = region.height.min(img_height - region.y);
    if width == 0 || height == 0 {
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(error = %e, "Failed to create figure directory");
        return None;
    }

    let path = dir.join(format!(
        "{}_{}_{}.png",
        basename,
        figure.figure_type.as_str(),
        index
    ));
    let crop = original.crop_imm(region.x, region.y, width, height).to_rgb8();
    match crop.save_with_format(&path, image::ImageFormat::Png) {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to save figure image");
            None
        }
    }
}
