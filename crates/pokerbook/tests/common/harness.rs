//! Isolated environment for book runs: a temp output root, an in-memory
//! database and scripted capabilities.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use pokerbook::books;
use pokerbook::config::ProcessingConfig;
use pokerbook::coordinator::{BookCoordinator, CoordinatorError, RunSummary};
use pokerbook::db::Database;
use pokerbook::pipeline::{ProgressReporter, RecordingProgress};
use pokerbook::processor::{Capabilities, ImagePreprocessor, PdfPageExtractor};

use super::fakes::{
    write_page_png, FakePdfExtractor, RecordingRenderer, ScriptedFigures, ScriptedOcr,
    ToggleTranslator,
};

pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_root: PathBuf,
    pub db: Database,
    pub ocr: Arc<ScriptedOcr>,
    pub figures: Arc<ScriptedFigures>,
    pub translator: Arc<ToggleTranslator>,
    pub renderer: Arc<RecordingRenderer>,
    pub progress: Arc<RecordingProgress>,
    pdf_extractor: Arc<dyn PdfPageExtractor>,
    translation_enabled: bool,
}

impl TestHarness {
    /// Harness with a reachable translation service.
    pub fn new() -> Self {
        Self::with_translation(true)
    }

    pub fn with_translation(available: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        let output_root = temp_dir.path().join("output");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input directory");

        Self {
            input_dir,
            output_root,
            db: Database::open_in_memory().expect("Failed to open database"),
            ocr: Arc::new(ScriptedOcr::default()),
            figures: Arc::new(ScriptedFigures::default()),
            translator: Arc::new(ToggleTranslator::new(available)),
            renderer: Arc::new(RecordingRenderer::new()),
            progress: Arc::new(RecordingProgress::new()),
            pdf_extractor: Arc::new(FakePdfExtractor::new(0)),
            translation_enabled: true,
            temp_dir,
        }
    }

    pub fn set_pdf_extractor(&mut self, extractor: FakePdfExtractor) {
        self.pdf_extractor = Arc::new(extractor);
    }

    pub fn disable_translation(&mut self) {
        self.translation_enabled = false;
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            preprocessor: Arc::new(ImagePreprocessor::new(1, 0.0)),
            text_extractor: self.ocr.clone(),
            figure_detector: self.figures.clone(),
            translator: self.translator.clone(),
            renderer: self.renderer.clone(),
            pdf_extractor: Arc::clone(&self.pdf_extractor),
        }
    }

    pub fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            output_root: self.output_root.clone(),
            ocr_enabled: true,
            translation_enabled: self.translation_enabled,
        }
    }

    pub fn coordinator(&self) -> BookCoordinator {
        let progress: Arc<dyn ProgressReporter> = self.progress.clone();
        BookCoordinator::new(self.db.clone(), self.processing_config(), self.capabilities())
            .with_progress(progress)
    }

    /// Writes `pages` page images to the input directory and returns their
    /// paths in page order.
    pub fn write_pages(&self, pages: u32) -> Vec<PathBuf> {
        (1..=pages)
            .map(|page| {
                let path = self.input_dir.join(format!("page_{:03}.png", page));
                write_page_png(&path, page);
                path
            })
            .collect()
    }

    /// Creates an image-set book of `pages` generated pages.
    pub fn image_book(&self, title: &str, pages: u32) -> (i64, Vec<PathBuf>) {
        let images = self.write_pages(pages);
        let book_id = books::create_book_from_images(&self.db, title, "", &images)
            .expect("Failed to create book");
        (book_id, images)
    }

    /// Creates a PDF book backed by a placeholder file; page contents come
    /// from the configured [`FakePdfExtractor`].
    pub fn pdf_book(&self, title: &str) -> i64 {
        let pdf = self.input_dir.join("book.pdf");
        std::fs::write(&pdf, b"%PDF-1.5\n").expect("Failed to write PDF");
        books::create_book_from_pdf(&self.db, title, "", &pdf).expect("Failed to create book")
    }

    /// Queues a job and runs the book on the calling thread.
    pub fn process(&self, book_id: i64) -> (i64, Result<RunSummary, CoordinatorError>) {
        let job_id = books::enqueue_processing(&self.db, book_id).expect("Failed to queue job");
        (job_id, self.coordinator().run(book_id, job_id))
    }

    pub fn reprocess(&self, book_id: i64) -> (i64, Result<RunSummary, CoordinatorError>) {
        let job_id = books::prepare_reprocess(&self.db, book_id).expect("Failed to reset book");
        (job_id, self.coordinator().run(book_id, job_id))
    }

    pub fn book_dir(&self, book_id: i64) -> PathBuf {
        self.output_root.join(format!("book_{}", book_id))
    }

    /// Files in a subdirectory of the book's output root, sorted by name.
    pub fn files_in(&self, book_id: i64, subdir: &str) -> Vec<PathBuf> {
        let dir = self.book_dir(book_id).join(subdir);
        let mut files: Vec<PathBuf> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }
}
