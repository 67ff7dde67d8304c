//! Capability interfaces consumed by the page pipeline, and their
//! production implementations.

pub mod figure;
pub mod image;
pub mod ocr;
pub mod pages;
pub mod pdf;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ::image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::{FigureType, Region};
use crate::error::{PokerbookError, ProcessError};
use crate::render::{LopdfRenderer, PdfRenderer};
use crate::translation::{NoTranslator, OpenAiTranslator, Translator};

pub use figure::{save_figure_crop, NoFigureDetector};
pub use image::ImagePreprocessor;
pub use ocr::{clean_ocr_text, TesseractExtractor};
pub use pages::{extract_page_number, sort_by_page_number};
pub use pdf::PopplerPdfExtractor;

/// The decoded source image and its OCR-ready counterpart.
pub struct PreparedImage {
    pub original: DynamicImage,
    pub normalized: DynamicImage,
}

pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, path: &Path) -> Result<PreparedImage, ProcessError>;
}

pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, ProcessError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFigure {
    pub figure_type: FigureType,
    pub region: Region,
    pub description: String,
}

pub trait FigureDetector: Send + Sync {
    fn detect_figures(
        &self,
        normalized: &DynamicImage,
        original: &DynamicImage,
    ) -> Result<Vec<DetectedFigure>, ProcessError>;

    /// Crops the figure out of `original` and writes it as
    /// `{basename}_{type}_{index}.png` in `dir`. `None` if nothing was written.
    fn save_figure(
        &self,
        original: &DynamicImage,
        figure: &DetectedFigure,
        dir: &Path,
        basename: &str,
        index: usize,
    ) -> Option<PathBuf> {
        save_figure_crop(original, figure, dir, basename, index)
    }
}

/// One rasterized PDF page and the text embedded in it.
#[derive(Debug, Clone)]
pub struct ExtractedPdfPage {
    pub image_path: PathBuf,
    pub native_text: String,
}

pub trait PdfPageExtractor: Send + Sync {
    fn page_count(&self, pdf: &Path) -> Result<u32, ProcessError>;

    /// Rasterizes 1-based `page` to `{dir}/{basename}_source.png`.
    fn extract_page(
        &self,
        pdf: &Path,
        page: u32,
        dir: &Path,
        basename: &str,
    ) -> Result<ExtractedPdfPage, ProcessError>;
}

/// Every external capability a book run needs, constructed once and shared.
#[derive(Clone)]
pub struct Capabilities {
    pub preprocessor: Arc<dyn Preprocessor>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub figure_detector: Arc<dyn FigureDetector>,
    pub translator: Arc<dyn Translator>,
    pub renderer: Arc<dyn PdfRenderer>,
    pub pdf_extractor: Arc<dyn PdfPageExtractor>,
}

impl Capabilities {
    pub fn from_config(config: &Config) -> Result<Self, PokerbookError> {
        let translator: Arc<dyn Translator> = if config.translation.enabled {
            match crate::secrets::resolve_api_key(&config.translation)? {
                Some(key) => Arc::new(OpenAiTranslator::new(&config.translation, key)?),
                None => {
                    tracing::warn!("No translation API key configured, translation disabled");
                    Arc::new(NoTranslator)
                }
            }
        } else {
            Arc::new(NoTranslator)
        };

        Ok(Self {
            preprocessor: Arc::new(ImagePreprocessor::new(
                config.preprocess.min_width,
                config.preprocess.contrast,
            )),
            text_extractor: Arc::new(TesseractExtractor::new(
                &config.ocr.languages,
                config.ocr.dpi,
            )),
            figure_detector: Arc::new(NoFigureDetector),
            translator,
            renderer: Arc::new(LopdfRenderer::from_config(&config.pdf)),
            pdf_extractor: Arc::new(PopplerPdfExtractor::new(config.ocr.dpi)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_without_translation() {
        let mut config = Config::default();
        config.translation.enabled = false;

        let capabilities = Capabilities::from_config(&config).unwrap();
        assert!(!capabilities.translator.is_available());
    }

    #[test]
    fn test_from_config_with_direct_key() {
        let mut config = Config::default();
        config.translation.api_key = Some("sk-test".to_string());
        config.translation.base_url = "http://127.0.0.1:9/v1".to_string();

        assert!(Capabilities::from_config(&config).is_ok());
    }
}
