use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info_span};

use crate::config::ProcessingConfig;
use crate::db::page_repo::{NewFigure, PageUpdate};
use crate::db::{PageSource, PageStatus};
use crate::error::{ProcessError, StorageError};
use crate::processor::{
    Capabilities, FigureDetector, PdfPageExtractor, PreparedImage, Preprocessor, TextExtractor,
};
use crate::sanitize;
use crate::storage::{artifact_basename, layout};
use crate::translation::Purpose;

use super::context::{PageContext, PageInput, RunContext};
use super::document::{split_paragraphs, DocumentStructure, FigureRecord, TranslatedDocument};
use super::error::{PipelineError, PipelineWarning};
use super::progress::{ProgressEvent, Stage};
use super::stage::StageOutcome;

/// Everything one page attempt produced, persisted by the caller with a
/// single `record_outcome`.
#[derive(Debug)]
pub struct PageOutcome {
    pub status: PageStatus,
    pub document: Option<DocumentStructure>,
    pub update: PageUpdate,
    pub figures: Vec<NewFigure>,
    pub warnings: Vec<PipelineWarning>,
    pub error: Option<PipelineError>,
}

impl PageOutcome {
    pub fn is_processed(&self) -> bool {
        self.status == PageStatus::Processed
    }
}

/// Turns one page into a [`DocumentStructure`], isolating failures per
/// stage. Only preprocessing failures are page-fatal.
pub struct PagePipeline {
    ocr_enabled: bool,
    preprocessor: Arc<dyn Preprocessor>,
    text_extractor: Arc<dyn TextExtractor>,
    figure_detector: Arc<dyn FigureDetector>,
    pdf_extractor: Arc<dyn PdfPageExtractor>,
}

impl PagePipeline {
    pub fn new(config: &ProcessingConfig, capabilities: &Capabilities) -> Self {
        Self {
            ocr_enabled: config.ocr_enabled,
            preprocessor: Arc::clone(&capabilities.preprocessor),
            text_extractor: Arc::clone(&capabilities.text_extractor),
            figure_detector: Arc::clone(&capabilities.figure_detector),
            pdf_extractor: Arc::clone(&capabilities.pdf_extractor),
        }
    }

    pub fn process(&self, input: &PageInput, run: &RunContext<'_>) -> PageOutcome {
        let filename = sanitize::redact_path(input.source.path());
        let _page_span = info_span!("page",
            page_id = input.page_id,
            page_number = input.page_number,
            source = %filename,
        )
        .entered();

        run.progress.report(ProgressEvent::PageStarted {
            page_number: input.page_number,
        });

        let basename = artifact_basename(&input.source, input.page_number, run.timestamp);
        let mut ctx = PageContext::new(input.clone(), basename);

        // Step 1: Preprocess
        let prepared = {
            let _step = info_span!("preprocess").entered();
            let outcome = self.step_preprocess(&mut ctx, run);
            report_stage(run, &ctx, Stage::Preprocess, &outcome);
            match outcome.into_value() {
                Ok(prepared) => prepared,
                Err(e) => return self.failed(ctx, e, run),
            }
        };

        // Step 2: Extract text
        {
            let _step = info_span!("extract_text").entered();
            let outcome = self.step_extract_text(&ctx, &prepared);
            report_stage(run, &ctx, Stage::ExtractText, &outcome);
            if let Some(reason) = outcome.reason() {
                ctx.warn(PipelineWarning::TextExtractionFailed {
                    reason: reason.to_string(),
                });
            }
            match outcome.into_value() {
                Ok(text) => ctx.raw_text = text,
                Err(e) => return self.failed(ctx, e, run),
            }
            let result = layout::write_text(&run.layout.raw_text(&ctx.basename), &ctx.raw_text);
            write_artifact(&mut ctx, "raw text", result);
        }

        // Step 3: Enhance text
        {
            let _step = info_span!("enhance_text").entered();
            let outcome = self.step_enhance_text(&ctx, run);
            report_stage(run, &ctx, Stage::EnhanceText, &outcome);
            if let Some(reason) = outcome.reason() {
                ctx.warn(PipelineWarning::EnhancementFailed {
                    reason: reason.to_string(),
                });
            }
            match outcome.into_value() {
                Ok(text) => ctx.enhanced_text = text,
                Err(e) => return self.failed(ctx, e, run),
            }
            let path = run.layout.corrected_text(&ctx.basename);
            let result = layout::write_text(&path, &ctx.enhanced_text);
            write_artifact(&mut ctx, "corrected text", result);
        }

        // Step 4: Detect figures
        {
            let _step = info_span!("detect_figures").entered();
            let outcome = self.step_detect_figures(&mut ctx, run, &prepared);
            report_stage(run, &ctx, Stage::DetectFigures, &outcome);
            if let Some(reason) = outcome.reason() {
                ctx.warn(PipelineWarning::FigureDetectionFailed {
                    reason: reason.to_string(),
                });
            }
            match outcome.into_value() {
                Ok(figures) => ctx.figures = figures,
                Err(e) => return self.failed(ctx, e, run),
            }
        }

        let mut document = build_document(&ctx);

        // Step 5: Translate
        {
            let _step = info_span!("translate").entered();
            let outcome = step_translate(&document, run);
            report_stage(run, &ctx, Stage::Translate, &outcome);
            if let Some(reason) = outcome.reason() {
                ctx.warn(PipelineWarning::TranslationFailed {
                    reason: reason.to_string(),
                });
            }
            match outcome.into_value() {
                Ok(translated) => ctx.translated = translated,
                Err(e) => return self.failed(ctx, e, run),
            }
            if let Some(translated) = &ctx.translated {
                let path = run.layout.translated_json(&ctx.basename);
                let result = layout::write_json(&path, translated);
                write_artifact(&mut ctx, "translated structure", result);
            }
        }
        document.translated = ctx.translated.clone();

        let structure_path = run.layout.structure_json(&ctx.basename);
        match layout::write_json(&structure_path, &document) {
            Ok(()) => {
                debug!(file = %sanitize::redact_path(&structure_path), "Structure written");
                ctx.structure_path = Some(structure_path);
            }
            Err(e) => ctx.warn(PipelineWarning::ArtifactNotWritten {
                artifact: "structure",
                reason: e.to_string(),
            }),
        }

        run.progress.report(ProgressEvent::PageFinished {
            page_number: input.page_number,
            status: PageStatus::Processed,
        });

        let update = PageUpdate {
            status: PageStatus::Processed,
            processed_image: ctx.processed_image.as_ref().map(|p| path_string(p)),
            original_text: Some(document.raw_text.clone()),
            enhanced_text: Some(document.enhanced_text.clone()),
            translated_content: Some(document.translated_content()),
            structure_path: ctx.structure_path.as_ref().map(|p| path_string(p)),
            error_message: None,
        };

        PageOutcome {
            status: PageStatus::Processed,
            figures: document.new_figures(),
            document: Some(document),
            update,
            warnings: ctx.warnings,
            error: None,
        }
    }

    /// Resolves the page image (rasterizing PDF pages), normalizes it and
    /// saves the normalized image. Any failure here is page-fatal.
    fn step_preprocess(
        &self,
        ctx: &mut PageContext,
        run: &RunContext<'_>,
    ) -> StageOutcome<PreparedImage> {
        let image_path = match &ctx.input.source {
            PageSource::Image(path) => path.clone(),
            PageSource::PdfPage { path, page } => {
                match self.pdf_extractor.extract_page(
                    path,
                    *page,
                    &run.layout.images_dir(),
                    &ctx.basename,
                ) {
                    Ok(extracted) => {
                        ctx.native_text = Some(extracted.native_text);
                        extracted.image_path
                    }
                    Err(e) => return StageOutcome::Failed(e.into()),
                }
            }
            PageSource::Pdf(path) => {
                return StageOutcome::Failed(
                    ProcessError::PdfProcessing(format!(
                        "{} was not split into pages",
                        sanitize::redact_path(path)
                    ))
                    .into(),
                )
            }
        };

        let prepared = match self.preprocessor.preprocess(&image_path) {
            Ok(prepared) => prepared,
            Err(e) => return StageOutcome::Failed(e.into()),
        };

        let processed_path = run.layout.preprocessed_image(&ctx.basename);
        if let Err(e) = save_png(&prepared, &processed_path) {
            return StageOutcome::Failed(e.into());
        }
        debug!(file = %sanitize::redact_path(&processed_path), "Preprocessed image written");

        ctx.source_image = Some(image_path);
        ctx.processed_image = Some(processed_path);
        StageOutcome::Completed(prepared)
    }

    /// OCR of the normalized image. For PDF pages, the longer of OCR and
    /// embedded text (by bytes) wins. OCR failure falls back to the embedded
    /// text, or to no text.
    fn step_extract_text(&self, ctx: &PageContext, prepared: &PreparedImage) -> StageOutcome<String> {
        let native = ctx.native_text.clone().unwrap_or_default();
        if !self.ocr_enabled {
            return StageOutcome::Completed(native);
        }

        match self.text_extractor.extract_text(&prepared.normalized) {
            Ok(ocr) => {
                if native.len() > ocr.len() {
                    debug!(native = native.len(), ocr = ocr.len(), "Using embedded PDF text");
                    StageOutcome::Completed(native)
                } else {
                    StageOutcome::Completed(ocr)
                }
            }
            Err(e) => StageOutcome::fallback(native, e),
        }
    }

    /// OCR correction through the translation service. Falls back to the
    /// extracted text; skipped for empty text or an unavailable service.
    fn step_enhance_text(&self, ctx: &PageContext, run: &RunContext<'_>) -> StageOutcome<String> {
        let raw = &ctx.raw_text;
        if raw.trim().is_empty() || !run.availability.is_available() {
            return StageOutcome::Completed(raw.clone());
        }

        match run.translator.translate(raw, Purpose::OcrCorrection) {
            Ok(corrected) if !corrected.trim().is_empty() => StageOutcome::Completed(corrected),
            Ok(_) => StageOutcome::fallback(raw.clone(), "correction came back empty"),
            Err(e) => StageOutcome::fallback(raw.clone(), e),
        }
    }

    /// Detection failures yield no figures. Figures whose image cannot be
    /// saved are dropped.
    fn step_detect_figures(
        &self,
        ctx: &mut PageContext,
        run: &RunContext<'_>,
        prepared: &PreparedImage,
    ) -> StageOutcome<Vec<FigureRecord>> {
        let detected = match self
            .figure_detector
            .detect_figures(&prepared.normalized, &prepared.original)
        {
            Ok(detected) => detected,
            Err(e) => return StageOutcome::fallback(Vec::new(), e),
        };

        let mut figures = Vec::with_capacity(detected.len());
        for (i, figure) in detected.iter().enumerate() {
            let index = i + 1;
            let dir = run.layout.figure_dir(figure.figure_type);
            match self
                .figure_detector
                .save_figure(&prepared.original, figure, &dir, &ctx.basename, index)
            {
                Some(image_path) => figures.push(FigureRecord {
                    figure_type: figure.figure_type,
                    region: figure.region,
                    description: figure.description.clone(),
                    image_path,
                }),
                None => ctx.warn(PipelineWarning::FigureNotSaved { index }),
            }
        }

        debug!(detected = detected.len(), saved = figures.len(), "Figures detected");
        StageOutcome::Completed(figures)
    }

    fn failed(&self, ctx: PageContext, e: PipelineError, run: &RunContext<'_>) -> PageOutcome {
        error!(page_number = ctx.input.page_number, error = %e, "Page failed");
        run.progress.report(ProgressEvent::PageFinished {
            page_number: ctx.input.page_number,
            status: PageStatus::Error,
        });

        PageOutcome {
            status: PageStatus::Error,
            document: None,
            update: PageUpdate::error(e.to_string()),
            figures: Vec::new(),
            warnings: ctx.warnings,
            error: Some(e),
        }
    }
}

/// Translation of the whole page. An unavailable service leaves the page
/// untranslated without a warning; the run already logged it once.
fn step_translate(
    document: &DocumentStructure,
    run: &RunContext<'_>,
) -> StageOutcome<Option<TranslatedDocument>> {
    if !run.availability.is_available() {
        return StageOutcome::Completed(None);
    }

    match run.translator.translate_document(document) {
        Ok(translated) => StageOutcome::Completed(Some(translated)),
        Err(e) => StageOutcome::fallback(None, e),
    }
}

fn build_document(ctx: &PageContext) -> DocumentStructure {
    DocumentStructure {
        page_number: ctx.input.page_number,
        original_image: ctx.source_image.clone().unwrap_or_default(),
        processed_image: ctx.processed_image.clone().unwrap_or_default(),
        paragraphs: split_paragraphs(&ctx.enhanced_text),
        raw_text: ctx.raw_text.clone(),
        enhanced_text: ctx.enhanced_text.clone(),
        figures: ctx.figures.clone(),
        translated: None,
    }
}

fn report_stage<T>(run: &RunContext<'_>, ctx: &PageContext, stage: Stage, outcome: &StageOutcome<T>) {
    run.progress.report(ProgressEvent::Stage {
        page_number: ctx.input.page_number,
        stage,
        fallback: outcome.is_fallback(),
    });
}

fn write_artifact(ctx: &mut PageContext, artifact: &'static str, result: Result<(), StorageError>) {
    if let Err(e) = result {
        ctx.warn(PipelineWarning::ArtifactNotWritten {
            artifact,
            reason: e.to_string(),
        });
    }
}

fn save_png(prepared: &PreparedImage, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        layout::ensure_directory(parent)?;
    }
    prepared
        .normalized
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| StorageError::EncodeImage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
