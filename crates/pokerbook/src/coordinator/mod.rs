//! Runs the page pipeline over every page of a book and keeps the book and
//! job records truthful.
//!
//! Per-page failures are contained in the page's own record. Only failures
//! outside the page loop (missing records, database writes, the PDF split)
//! end the run, and those always leave the job `failed` and the book
//! `error`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, info_span, warn};

use crate::assembler::{BookStructure, ContentTree, Language, PdfAssembler};
use crate::config::ProcessingConfig;
use crate::db::{book_repo, job_repo, page_repo, Database, DatabaseError, PageSource};
use crate::error::StorageError;
use crate::pipeline::{
    DocumentStructure, NoopProgress, PageInput, PagePipeline, ProgressEvent, ProgressReporter,
    RunContext,
};
use crate::processor::Capabilities;
use crate::render::output_file_name;
use crate::sanitize;
use crate::storage::layout::{write_json, write_text};
use crate::storage::{artifact_timestamp, BookLayout};
use crate::translation::{CachedTranslator, TranslationAvailability};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Book {0} not found")]
    BookNotFound(i64),

    #[error("Job {0} not found")]
    JobNotFound(i64),

    #[error("Job {job_id} belongs to book {job_book_id}, not book {book_id}")]
    JobBookMismatch {
        job_id: i64,
        job_book_id: i64,
        book_id: i64,
    },

    #[error("No pages found for book {0}")]
    NoPages(i64),

    #[error("Failed to split PDF: {0}")]
    PdfSplit(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// What one completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub book_id: i64,
    pub job_id: i64,
    pub pages_processed: usize,
    pub pages_failed: usize,
    pub source_pdf: Option<PathBuf>,
    pub russian_pdf: Option<PathBuf>,
}

pub struct BookCoordinator {
    db: Database,
    config: ProcessingConfig,
    capabilities: Capabilities,
    pipeline: PagePipeline,
    progress: Arc<dyn ProgressReporter>,
}

impl BookCoordinator {
    pub fn new(db: Database, config: ProcessingConfig, capabilities: Capabilities) -> Self {
        let pipeline = PagePipeline::new(&config, &capabilities);
        Self {
            db,
            config,
            capabilities,
            pipeline,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Processes the book end to end. On error the job is marked `failed`
    /// and the book `error` with the error's message, unless the job itself
    /// does not exist. A job addressed to the wrong book is failed against
    /// its own book.
    pub fn run(&self, book_id: i64, job_id: i64) -> Result<RunSummary, CoordinatorError> {
        let _span = info_span!("book_run", book_id, job_id).entered();

        match self.run_book(book_id, job_id) {
            Ok(summary) => {
                info!(
                    pages_processed = summary.pages_processed,
                    pages_failed = summary.pages_failed,
                    "Book run completed"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, "Book run failed");
                match e {
                    CoordinatorError::JobNotFound(_) => {}
                    CoordinatorError::JobBookMismatch { job_book_id, .. } => {
                        self.record_failure(job_book_id, job_id, &e.to_string())
                    }
                    _ => self.record_failure(book_id, job_id, &e.to_string()),
                }
                Err(e)
            }
        }
    }

    /// Marks the job `failed` and the book `error`. Used by callers that
    /// catch failures the run itself could not report.
    pub fn record_failure(&self, book_id: i64, job_id: i64, message: &str) {
        if let Err(e) = job_repo::fail(&self.db, job_id, book_id, message) {
            error!(error = %e, "Failed to record run failure");
        }
    }

    fn run_book(&self, book_id: i64, job_id: i64) -> Result<RunSummary, CoordinatorError> {
        let book = book_repo::find_by_id(&self.db, book_id)?
            .ok_or(CoordinatorError::BookNotFound(book_id))?;
        let job =
            job_repo::find_by_id(&self.db, job_id)?.ok_or(CoordinatorError::JobNotFound(job_id))?;
        if job.book_id != book_id {
            return Err(CoordinatorError::JobBookMismatch {
                job_id,
                job_book_id: job.book_id,
                book_id,
            });
        }

        job_repo::start(&self.db, job_id, book_id)?;

        let layout = BookLayout::new(&self.config.output_root, book_id);
        layout.ensure()?;

        let pages = self.pages_to_process(book_id)?;
        info!(pages = pages.len(), "Processing book");

        let availability = TranslationAvailability::probe(
            self.capabilities.translator.as_ref(),
            self.config.translation_enabled,
        );
        if !availability.is_available() {
            warn!("Translation service unavailable for this run, pages stay untranslated");
        }

        let translator = CachedTranslator::with_file(
            self.capabilities.translator.as_ref(),
            &layout.translation_cache(),
        );
        let timestamp = artifact_timestamp();
        let run = RunContext {
            layout: &layout,
            timestamp: &timestamp,
            translator: &translator,
            availability,
            progress: self.progress.as_ref(),
        };

        let mut documents: Vec<DocumentStructure> = Vec::with_capacity(pages.len());
        let mut pages_failed = 0;
        for page in &pages {
            page_repo::mark_processing(&self.db, page.page_id)?;
            let outcome = self.pipeline.process(page, &run);
            page_repo::record_outcome(&self.db, page.page_id, &outcome.update, &outcome.figures)?;

            match outcome.document {
                Some(document) => documents.push(document),
                None => pages_failed += 1,
            }
        }
        translator.save();

        let structure = BookStructure {
            title: book.title.clone(),
            pages: documents,
        };
        let structure_path = layout.book_structure(&sanitize::file_stem(&book.title));
        if let Err(e) = write_json(&structure_path, &structure) {
            warn!(error = %e, "Failed to write book structure");
        }

        let assembler = PdfAssembler::new(&translator, availability);
        let mut outputs = Vec::with_capacity(Language::ALL.len());
        for language in Language::ALL {
            let tree = assembler.assemble(&structure.pages, language, &book.title);
            let path = self.generate_pdf(&tree, language, &book.title, &layout.pdf_dir());
            self.progress.report(ProgressEvent::PdfGenerated {
                language,
                path: path.clone(),
            });
            outputs.push(path);
        }
        let russian_pdf = outputs.pop().flatten();
        let source_pdf = outputs.pop().flatten();

        let source_ref = source_pdf.as_deref().map(path_str);
        let russian_ref = russian_pdf.as_deref().map(path_str);
        job_repo::complete(
            &self.db,
            job_id,
            book_id,
            source_ref.as_deref(),
            russian_ref.as_deref(),
        )?;

        Ok(RunSummary {
            book_id,
            job_id,
            pages_processed: structure.pages.len(),
            pages_failed,
            source_pdf,
            russian_pdf,
        })
    }

    /// Pages in page-number order. A book uploaded as one PDF is split into
    /// one page record per PDF page first.
    fn pages_to_process(&self, book_id: i64) -> Result<Vec<PageInput>, CoordinatorError> {
        let mut rows = page_repo::list_for_book(&self.db, book_id)?;
        if rows.is_empty() {
            return Err(CoordinatorError::NoPages(book_id));
        }

        let whole_pdf = rows.iter().find_map(|row| match &row.source {
            PageSource::Pdf(path) => Some(path.clone()),
            _ => None,
        });
        if let Some(pdf) = whole_pdf {
            let _span = info_span!("split_pdf", file = %sanitize::redact_path(&pdf)).entered();
            if rows.len() > 1 {
                warn!(records = rows.len(), "Book has a PDF among other pages, keeping only the PDF");
            }

            let page_count = self
                .capabilities
                .pdf_extractor
                .page_count(&pdf)
                .map_err(|e| CoordinatorError::PdfSplit(e.to_string()))?;
            if page_count == 0 {
                return Err(CoordinatorError::NoPages(book_id));
            }

            page_repo::replace_with_pdf_pages(&self.db, book_id, &pdf, page_count)?;
            rows = page_repo::list_for_book(&self.db, book_id)?;
        }

        Ok(rows
            .into_iter()
            .map(|row| PageInput {
                page_id: row.id,
                page_number: row.page_number,
                source: row.source,
            })
            .collect())
    }

    /// Renders one language. Failures are logged only; when the expected
    /// file is absent afterwards a marker file is written in its place and
    /// its path returned.
    fn generate_pdf(
        &self,
        tree: &ContentTree,
        language: Language,
        title: &str,
        output_dir: &Path,
    ) -> Option<PathBuf> {
        let _span = info_span!("generate_pdf", language = language.tag()).entered();
        let expected = output_dir.join(output_file_name(title, language));

        let reason = match self.capabilities.renderer.render_pdf(tree, language, title, output_dir) {
            Ok(path) if path.is_file() => {
                info!(file = %sanitize::redact_path(&path), "PDF generated");
                return Some(path);
            }
            Ok(path) => format!("renderer reported {} but wrote nothing", path.display()),
            Err(e) => {
                error!(error = %e, "PDF generation failed");
                e.to_string()
            }
        };

        if expected.is_file() {
            return Some(expected);
        }

        let marker = marker_path(&expected);
        match write_text(&marker, &format!("PDF generation failed: {}\n", reason)) {
            Ok(()) => {
                warn!(file = %sanitize::redact_path(&marker), "Wrote marker file in place of PDF");
                Some(marker)
            }
            Err(e) => {
                error!(error = %e, "Failed to write marker file");
                None
            }
        }
    }
}

fn marker_path(expected: &Path) -> PathBuf {
    let mut name = expected.as_os_str().to_os_string();
    name.push(".marker.txt");
    PathBuf::from(name)
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
