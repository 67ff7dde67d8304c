use std::path::PathBuf;

use crate::db::PageSource;
use crate::pipeline::document::{FigureRecord, TranslatedDocument};
use crate::pipeline::progress::ProgressReporter;
use crate::storage::BookLayout;
use crate::translation::{TranslationAvailability, Translator};

use super::error::PipelineWarning;

/// One page to process.
#[derive(Debug, Clone)]
pub struct PageInput {
    pub page_id: i64,
    pub page_number: u32,
    pub source: PageSource,
}

/// Shared by every page of one book run.
pub struct RunContext<'a> {
    pub layout: &'a BookLayout,
    /// Shared by all artifact names of the run.
    pub timestamp: &'a str,
    pub translator: &'a dyn Translator,
    pub availability: TranslationAvailability,
    pub progress: &'a dyn ProgressReporter,
}

pub struct PageContext {
    // Input
    pub input: PageInput,
    pub basename: String,

    // Preprocess: the image fed to the pipeline and its normalized copy
    pub source_image: Option<PathBuf>,
    pub processed_image: Option<PathBuf>,

    // Embedded text of a PDF page
    pub native_text: Option<String>,

    // Extract text result, never rewritten afterwards
    pub raw_text: String,

    // Enhance text result
    pub enhanced_text: String,

    // Detect figures result, saved figures only
    pub figures: Vec<FigureRecord>,

    // Translate result
    pub translated: Option<TranslatedDocument>,

    pub structure_path: Option<PathBuf>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PageContext {
    pub fn new(input: PageInput, basename: String) -> Self {
        Self {
            input,
            basename,
            source_image: None,
            processed_image: None,
            native_text: None,
            raw_text: String::new(),
            enhanced_text: String::new(),
            figures: Vec::new(),
            translated: None,
            structure_path: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: PipelineWarning) {
        tracing::warn!(page_number = self.input.page_number, "{}", warning);
        self.warnings.push(warning);
    }
}
