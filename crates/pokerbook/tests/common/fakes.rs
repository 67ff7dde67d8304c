//! Scripted capability implementations.
//!
//! Page images are generated with a width of `PAGE_WIDTH_BASE + page`, so
//! fakes that only see pixels can tell which page they are looking at.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use pokerbook::assembler::{ContentTree, Language};
use pokerbook::error::ProcessError;
use pokerbook::processor::{DetectedFigure, ExtractedPdfPage, FigureDetector, PdfPageExtractor, TextExtractor};
use pokerbook::render::{LopdfRenderer, PdfRenderer, RenderError};
use pokerbook::translation::{Purpose, TranslationError, Translator};

pub const PAGE_WIDTH_BASE: u32 = 40;
pub const PAGE_HEIGHT: u32 = 30;

/// Writes a small RGB PNG identifying `page` by its width.
pub fn write_page_png(path: &Path, page: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut img = RgbImage::from_pixel(PAGE_WIDTH_BASE + page, PAGE_HEIGHT, Rgb([250, 250, 250]));
    for x in 2..12 {
        img.put_pixel(x, 5, Rgb([10, 10, 10]));
    }
    img.save(path).unwrap();
}

/// Page number encoded in an image written by [`write_page_png`].
pub fn page_of(image: &DynamicImage) -> u32 {
    image.dimensions().0.saturating_sub(PAGE_WIDTH_BASE)
}

/// OCR text per page number; unknown pages yield an empty string.
#[derive(Default)]
pub struct ScriptedOcr {
    texts: Mutex<HashMap<u32, String>>,
    failing: Mutex<HashSet<u32>>,
}

impl ScriptedOcr {
    pub fn set(&self, page: u32, text: &str) {
        self.texts.lock().unwrap().insert(page, text.to_string());
    }

    pub fn fail_on(&self, page: u32) {
        self.failing.lock().unwrap().insert(page);
    }
}

impl TextExtractor for ScriptedOcr {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, ProcessError> {
        let page = page_of(image);
        if self.failing.lock().unwrap().contains(&page) {
            return Err(ProcessError::OcrFailed(format!("scripted failure on page {}", page)));
        }
        Ok(self
            .texts
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_default())
    }
}

/// Figure lists per page number. Crops use the default `save_figure`.
#[derive(Default)]
pub struct ScriptedFigures {
    figures: Mutex<HashMap<u32, Vec<DetectedFigure>>>,
    failing: AtomicBool,
}

impl ScriptedFigures {
    pub fn set(&self, page: u32, figures: Vec<DetectedFigure>) {
        self.figures.lock().unwrap().insert(page, figures);
    }

    pub fn fail_all(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

impl FigureDetector for ScriptedFigures {
    fn detect_figures(
        &self,
        _normalized: &DynamicImage,
        original: &DynamicImage,
    ) -> Result<Vec<DetectedFigure>, ProcessError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProcessError::FigureDetection("scripted failure".to_string()));
        }
        Ok(self
            .figures
            .lock()
            .unwrap()
            .get(&page_of(original))
            .cloned()
            .unwrap_or_default())
    }
}

/// Translator that can be switched off. Corrections prefix `Fixed: `,
/// translations prefix `RU: `.
pub struct ToggleTranslator {
    available: AtomicBool,
    failing: AtomicBool,
    probes: AtomicUsize,
    calls: Mutex<Vec<(String, Purpose)>>,
}

impl ToggleTranslator {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
            failing: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Reports reachable but rejects every request.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<(String, Purpose)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Translator for ToggleTranslator {
    fn is_available(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.available.load(Ordering::SeqCst)
    }

    fn translate(&self, text: &str, purpose: Purpose) -> Result<String, TranslationError> {
        self.calls.lock().unwrap().push((text.to_string(), purpose));
        if !self.available.load(Ordering::SeqCst) {
            return Err(TranslationError::Unavailable);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(TranslationError::EmptyResponse);
        }
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(match purpose {
            Purpose::OcrCorrection => format!("Fixed: {}", text),
            _ => format!("RU: {}", text),
        })
    }
}

/// Renders through the real lopdf renderer (built-in font) and records
/// every tree it was given. Can be told to fail one language.
pub struct RecordingRenderer {
    inner: LopdfRenderer,
    trees: Mutex<Vec<ContentTree>>,
    fail_language: Mutex<Option<Language>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self {
            inner: LopdfRenderer::with_font(None, 11.0),
            trees: Mutex::new(Vec::new()),
            fail_language: Mutex::new(None),
        }
    }

    pub fn fail_for(&self, language: Language) {
        *self.fail_language.lock().unwrap() = Some(language);
    }

    pub fn trees(&self) -> Vec<ContentTree> {
        self.trees.lock().unwrap().clone()
    }

    /// The most recent tree rendered for `language`.
    pub fn last_tree(&self, language: Language) -> Option<ContentTree> {
        self.trees()
            .into_iter()
            .rev()
            .find(|tree| tree.language == language)
    }
}

impl PdfRenderer for RecordingRenderer {
    fn render_pdf(
        &self,
        tree: &ContentTree,
        language: Language,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        self.trees.lock().unwrap().push(tree.clone());
        if *self.fail_language.lock().unwrap() == Some(language) {
            return Err(RenderError::Serialize("scripted failure".to_string()));
        }
        self.inner.render_pdf(tree, language, title, output_dir)
    }
}

/// Splits a fake PDF into `pages` pages, rasterizing each as a page PNG
/// and reporting `native_text[page]` as its embedded text.
pub struct FakePdfExtractor {
    pages: u32,
    native_text: HashMap<u32, String>,
}

impl FakePdfExtractor {
    pub fn new(pages: u32) -> Self {
        Self {
            pages,
            native_text: HashMap::new(),
        }
    }

    pub fn with_text(mut self, page: u32, text: &str) -> Self {
        self.native_text.insert(page, text.to_string());
        self
    }
}

impl PdfPageExtractor for FakePdfExtractor {
    fn page_count(&self, pdf: &Path) -> Result<u32, ProcessError> {
        if !pdf.exists() {
            return Err(ProcessError::MissingSource(pdf.to_path_buf()));
        }
        Ok(self.pages)
    }

    fn extract_page(
        &self,
        pdf: &Path,
        page: u32,
        dir: &Path,
        basename: &str,
    ) -> Result<ExtractedPdfPage, ProcessError> {
        if !pdf.exists() {
            return Err(ProcessError::MissingSource(pdf.to_path_buf()));
        }
        let image_path = dir.join(format!("{}_source.png", basename));
        write_page_png(&image_path, page);
        Ok(ExtractedPdfPage {
            image_path,
            native_text: self.native_text.get(&page).cloned().unwrap_or_default(),
        })
    }
}
