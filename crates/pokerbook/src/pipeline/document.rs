//! The per-page document structure and its translated counterpart.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::page_repo::NewFigure;
use crate::db::{FigureType, Region};

/// Stored as a page's translated content, and rendered in the Russian PDF,
/// whenever no translation was produced.
pub const TRANSLATION_PLACEHOLDER: &str = "[RU] Перевод недоступен";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureRecord {
    #[serde(rename = "type")]
    pub figure_type: FigureType,
    pub region: Region,
    pub description: String,
    pub image_path: PathBuf,
}

/// Same shape as [`DocumentStructure`] with translated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedDocument {
    pub page_number: u32,
    pub original_image: PathBuf,
    pub processed_image: PathBuf,
    pub paragraphs: Vec<String>,
    pub figures: Vec<FigureRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub page_number: u32,
    pub original_image: PathBuf,
    pub processed_image: PathBuf,
    /// Paragraphs of the enhanced text.
    pub paragraphs: Vec<String>,
    /// Extracted text before enhancement. Never rewritten.
    pub raw_text: String,
    pub enhanced_text: String,
    pub figures: Vec<FigureRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated: Option<TranslatedDocument>,
}

impl DocumentStructure {
    /// Paragraphs for the source-language output: the raw text when there is
    /// any, the enhanced paragraphs otherwise.
    pub fn source_paragraphs(&self) -> Vec<String> {
        if self.raw_text.trim().is_empty() {
            self.paragraphs.clone()
        } else {
            split_paragraphs(&self.raw_text)
        }
    }

    /// Translated paragraphs, or the placeholder as a single paragraph.
    pub fn translated_paragraphs(&self) -> Vec<String> {
        match &self.translated {
            Some(translated) => translated.paragraphs.clone(),
            None => vec![TRANSLATION_PLACEHOLDER.to_string()],
        }
    }

    /// Value persisted in `pages.translated_content`.
    pub fn translated_content(&self) -> String {
        match &self.translated {
            Some(translated) => translated.paragraphs.join("\n\n"),
            None => TRANSLATION_PLACEHOLDER.to_string(),
        }
    }

    /// Figures paired with their translated descriptions, ready to persist.
    pub fn new_figures(&self) -> Vec<NewFigure> {
        self.figures
            .iter()
            .enumerate()
            .map(|(i, figure)| NewFigure {
                figure_type: figure.figure_type,
                region: figure.region,
                image_path: figure.image_path.to_string_lossy().into_owned(),
                description: figure.description.clone(),
                translated_description: self
                    .translated
                    .as_ref()
                    .and_then(|t| t.figures.get(i))
                    .map(|f| f.description.clone()),
            })
            .collect()
    }
}

/// Splits text on blank lines, dropping empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn figure(figure_type: FigureType, description: &str) -> FigureRecord {
        FigureRecord {
            figure_type,
            region: Region::new(0, 0, 10, 10),
            description: description.to_string(),
            image_path: PathBuf::from(format!("/out/{}.png", description)),
        }
    }

    fn doc(raw: &str, enhanced: &str) -> DocumentStructure {
        DocumentStructure {
            page_number: 1,
            original_image: PathBuf::from("/in/p1.png"),
            processed_image: PathBuf::from("/out/p1_preprocessed.png"),
            paragraphs: split_paragraphs(enhanced),
            raw_text: raw.to_string(),
            enhanced_text: enhanced.to_string(),
            figures: vec![figure(FigureType::Table, "ranges"), figure(FigureType::Chart, "ev")],
            translated: None,
        }
    }

    #[test]
    fn test_split_paragraphs() {
        assert_eq!(
            split_paragraphs("First.\n\n  Second line\ncontinues.\n\n\n\nThird."),
            vec!["First.", "Second line\ncontinues.", "Third."]
        );
        assert!(split_paragraphs("   ").is_empty());
    }

    #[test]
    fn test_source_paragraphs_prefer_raw_text() {
        let page = doc("Raw one.\n\nRaw two.", "Fixed one.\n\nFixed two.");
        assert_eq!(page.source_paragraphs(), vec!["Raw one.", "Raw two."]);
    }

    #[test]
    fn test_source_paragraphs_fall_back_to_enhanced() {
        let page = doc("", "Fixed one.");
        assert_eq!(page.source_paragraphs(), vec!["Fixed one."]);
    }

    #[test]
    fn test_placeholder_without_translation() {
        let page = doc("Raw.", "Raw.");
        assert_eq!(page.translated_paragraphs(), vec![TRANSLATION_PLACEHOLDER]);
        assert_eq!(page.translated_content(), TRANSLATION_PLACEHOLDER);
        assert!(page.new_figures().iter().all(|f| f.translated_description.is_none()));
    }

    #[test]
    fn test_translated_content_and_figures() {
        let mut page = doc("Raw.", "Raw.");
        page.translated = Some(TranslatedDocument {
            page_number: 1,
            original_image: page.original_image.clone(),
            processed_image: page.processed_image.clone(),
            paragraphs: vec!["Раз.".to_string(), "Два.".to_string()],
            figures: vec![figure(FigureType::Table, "диапазоны"), figure(FigureType::Chart, "ев")],
        });

        assert_eq!(page.translated_content(), "Раз.\n\nДва.");
        let figures = page.new_figures();
        assert_eq!(figures[0].description, "ranges");
        assert_eq!(figures[0].translated_description.as_deref(), Some("диапазоны"));
        assert_eq!(figures[1].image_path, "/out/ev.png");
    }

    #[test]
    fn test_structure_json_shape() {
        let json = serde_json::to_value(doc("a", "a")).unwrap();
        assert_eq!(json["figures"][0]["type"], "table");
        assert_eq!(json["page_number"], 1);
        assert!(json.get("translated").is_none());
    }
}
