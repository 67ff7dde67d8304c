//! Translation service used for OCR correction and English to Russian
//! translation.

pub mod cache;
pub mod client;

use std::fmt;

use thiserror::Error;

use crate::db::FigureType;
use crate::pipeline::document::{DocumentStructure, FigureRecord, TranslatedDocument};

pub use cache::CachedTranslator;
pub use client::OpenAiTranslator;

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("Translation service unavailable")]
    Unavailable,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Translation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed translation response: {0}")]
    MalformedResponse(String),

    #[error("Translation service returned an empty response")]
    EmptyResponse,
}

/// What a piece of text is being sent for. Each purpose has its own prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Purpose {
    Translation,
    OcrCorrection,
    FigureDescription,
    TechnicalContent,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Translation => "translation",
            Self::OcrCorrection => "ocr_correction",
            Self::FigureDescription => "figure_description",
            Self::TechnicalContent => "technical_content",
        }
    }

    /// Tables carry numbers and notation, everything else prose.
    pub fn for_figure(figure_type: FigureType) -> Self {
        match figure_type {
            FigureType::Table => Self::TechnicalContent,
            _ => Self::FigureDescription,
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Translator: Send + Sync {
    /// Reachability probe. May perform a network round trip, so callers
    /// should ask once per run.
    fn is_available(&self) -> bool;

    /// Translates (or, for [`Purpose::OcrCorrection`], cleans) `text`.
    /// Blank input yields an empty string.
    fn translate(&self, text: &str, purpose: Purpose) -> Result<String, TranslationError>;

    /// Translates paragraphs and figure descriptions. Page number, image
    /// paths, figure types and regions are carried over unchanged.
    fn translate_document(
        &self,
        doc: &DocumentStructure,
    ) -> Result<TranslatedDocument, TranslationError> {
        let paragraphs = doc
            .paragraphs
            .iter()
            .map(|p| self.translate(p, Purpose::Translation))
            .collect::<Result<Vec<_>, _>>()?;

        let figures = doc
            .figures
            .iter()
            .map(|figure| -> Result<FigureRecord, TranslationError> {
                Ok(FigureRecord {
                    description: self
                        .translate(&figure.description, Purpose::for_figure(figure.figure_type))?,
                    ..figure.clone()
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TranslatedDocument {
            page_number: doc.page_number,
            original_image: doc.original_image.clone(),
            processed_image: doc.processed_image.clone(),
            paragraphs,
            figures,
        })
    }
}

/// The absent translation capability.
pub struct NoTranslator;

impl Translator for NoTranslator {
    fn is_available(&self) -> bool {
        false
    }

    fn translate(&self, _text: &str, _purpose: Purpose) -> Result<String, TranslationError> {
        Err(TranslationError::Unavailable)
    }
}

/// Result of the once-per-run reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationAvailability {
    Available,
    Unavailable,
}

impl TranslationAvailability {
    /// Probes `translator` unless translation is disabled outright.
    pub fn probe(translator: &dyn Translator, enabled: bool) -> Self {
        let _span = tracing::info_span!("translation.probe").entered();
        if enabled && translator.is_available() {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}
