//! Merges per-page document structures into one content tree per output
//! language.
//!
//! Pages contribute in increasing page-number order. For the source language
//! the untouched extracted text is used, so OCR corrections never reach the
//! source PDF; the Russian tree uses the translated paragraphs, which carry
//! the placeholder when a page was not translated.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::{FigureType, Region};
use crate::pipeline::document::DocumentStructure;
use crate::translation::{Purpose, TranslationAvailability, Translator};

/// Appended to the book title when it could not be translated.
pub const UNTRANSLATED_TITLE_SUFFIX: &str = "[RU]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    Source,
    #[serde(rename = "ru")]
    Russian,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Source, Language::Russian];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Source => "en",
            Self::Russian => "ru",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "en" => Some(Self::Source),
            "ru" => Some(Self::Russian),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A chart or diagram in the content tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentFigure {
    pub figure_type: FigureType,
    pub region: Region,
    pub image_path: PathBuf,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentTable {
    pub region: Region,
    pub image_path: PathBuf,
    pub description: String,
}

/// Flat, language-specific input of the PDF renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentTree {
    pub title: String,
    pub language: Language,
    pub paragraphs: Vec<String>,
    pub figures: Vec<ContentFigure>,
    pub tables: Vec<ContentTable>,
}

/// Every processed page of a book, written as a debug artifact before
/// assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookStructure {
    pub title: String,
    pub pages: Vec<DocumentStructure>,
}

pub struct PdfAssembler<'a> {
    translator: &'a dyn Translator,
    availability: TranslationAvailability,
}

impl<'a> PdfAssembler<'a> {
    pub fn new(translator: &'a dyn Translator, availability: TranslationAvailability) -> Self {
        Self {
            translator,
            availability,
        }
    }

    pub fn assemble(
        &self,
        pages: &[DocumentStructure],
        language: Language,
        title: &str,
    ) -> ContentTree {
        let _span = tracing::info_span!("assemble", language = language.tag()).entered();

        let mut ordered: Vec<&DocumentStructure> = pages.iter().collect();
        ordered.sort_by_key(|page| page.page_number);

        let mut tree = ContentTree {
            title: self.title_for(title, language),
            language,
            paragraphs: Vec::new(),
            figures: Vec::new(),
            tables: Vec::new(),
        };

        for page in ordered {
            match language {
                Language::Source => tree.paragraphs.extend(page.source_paragraphs()),
                Language::Russian => tree.paragraphs.extend(page.translated_paragraphs()),
            }

            for (index, figure) in page.figures.iter().enumerate() {
                let description = match language {
                    Language::Source => figure.description.clone(),
                    Language::Russian => page
                        .translated
                        .as_ref()
                        .and_then(|t| t.figures.get(index))
                        .map(|f| f.description.clone())
                        .unwrap_or_else(|| figure.description.clone()),
                };

                match figure.figure_type {
                    FigureType::Chart | FigureType::Diagram => tree.figures.push(ContentFigure {
                        figure_type: figure.figure_type,
                        region: figure.region,
                        image_path: figure.image_path.clone(),
                        description,
                    }),
                    FigureType::Table => tree.tables.push(ContentTable {
                        region: figure.region,
                        image_path: figure.image_path.clone(),
                        description,
                    }),
                    // Unclassified regions stay out of the rendered book.
                    FigureType::Other => {}
                }
            }
        }

        tracing::debug!(
            paragraphs = tree.paragraphs.len(),
            figures = tree.figures.len(),
            tables = tree.tables.len(),
            "Content tree assembled"
        );
        tree
    }

    fn title_for(&self, title: &str, language: Language) -> String {
        if language == Language::Source {
            return title.to_string();
        }

        if self.availability.is_available() {
            match self.translator.translate(title, Purpose::Translation) {
                Ok(translated) if !translated.trim().is_empty() => {
                    return translated.trim().to_string()
                }
                Ok(_) => tracing::warn!("Title translation came back empty"),
                Err(e) => tracing::warn!(error = %e, "Title translation failed"),
            }
        }

        format!("{} {}", title, UNTRANSLATED_TITLE_SUFFIX)
    }
}
