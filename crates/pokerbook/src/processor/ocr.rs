use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;

use crate::error::ProcessError;
use crate::processor::TextExtractor;

/// Tesseract OCR through leptess. Cloning shares the configuration.
#[derive(Clone)]
pub struct TesseractExtractor {
    inner: Arc<TesseractInner>,
}

struct TesseractInner {
    languages: String,
    dpi: u32,
}

impl TesseractExtractor {
    pub fn new(languages: &[String], dpi: u32) -> Self {
        let languages = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            inner: Arc::new(TesseractInner { languages, dpi }),
        }
    }

    pub fn languages(&self) -> &str {
        &self.inner.languages
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract_text(&self, image: &DynamicImage) -> Result<String, ProcessError> {
        let mut png_data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to encode image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.inner.languages).map_err(|e| {
            ProcessError::OcrFailed(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;
        lt.set_source_resolution(self.inner.dpi as i32);

        let text = lt
            .get_utf8_text()
            .map_err(|e| ProcessError::OcrFailed(format!("OCR failed: {}", e)))?;

        Ok(clean_ocr_text(&text))
    }
}

/// Trims trailing whitespace on every line and collapses runs of blank lines
/// into a single blank line, so paragraphs stay separated by `\n\n`.
pub fn clean_ocr_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = 0;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_string() {
        let extractor = TesseractExtractor::new(&["eng".to_string(), "rus".to_string()], 300);
        assert_eq!(extractor.languages(), "eng+rus");
    }

    #[test]
    fn test_default_language() {
        let extractor = TesseractExtractor::new(&[], 300);
        assert_eq!(extractor.languages(), "eng");
    }

    #[test]
    fn test_clone_shares_inner() {
        let extractor = TesseractExtractor::new(&["eng".to_string()], 150);
        let cloned = extractor.clone();
        assert!(Arc::ptr_eq(&extractor.inner, &cloned.inner));
        assert_eq!(cloned.inner.dpi, 150);
    }

    #[test]
    fn test_clean_ocr_text() {
        let raw = "Pot odds   \nmatter.\n\n\n\nImplied odds\t\n  \nmatter more.\n\n";
        assert_eq!(
            clean_ocr_text(raw),
            "Pot odds\nmatter.\n\nImplied odds\n\nmatter more."
        );
    }

    #[test]
    fn test_clean_ocr_text_empty() {
        assert_eq!(clean_ocr_text("\n \n\t\n"), "");
    }
}
