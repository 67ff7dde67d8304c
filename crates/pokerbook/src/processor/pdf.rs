use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ProcessError;
use crate::processor::{ExtractedPdfPage, PdfPageExtractor};

/// Splits PDFs with lopdf (page count, embedded text) and poppler's
/// `pdftoppm` (rasterization).
pub struct PopplerPdfExtractor {
    dpi: u32,
}

impl PopplerPdfExtractor {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }
}

impl PdfPageExtractor for PopplerPdfExtractor {
    fn page_count(&self, pdf: &Path) -> Result<u32, ProcessError> {
        if !pdf.exists() {
            return Err(ProcessError::MissingSource(pdf.to_path_buf()));
        }

        match lopdf::Document::load(pdf) {
            Ok(doc) => Ok(doc.get_pages().len() as u32),
            Err(e) => {
                tracing::warn!(error = %e, "lopdf could not parse PDF, asking pdfinfo");
                count_pages_with_pdfinfo(pdf)
            }
        }
    }

    fn extract_page(
        &self,
        pdf: &Path,
        page: u32,
        dir: &Path,
        basename: &str,
    ) -> Result<ExtractedPdfPage, ProcessError> {
        let _span = tracing::info_span!("processor.pdf_page", page).entered();

        if !pdf.exists() {
            return Err(ProcessError::MissingSource(pdf.to_path_buf()));
        }

        let native_text = native_page_text(pdf, page);
        let image_path = render_page(pdf, page, self.dpi, dir, basename)?;

        Ok(ExtractedPdfPage {
            image_path,
            native_text,
        })
    }
}

/// Embedded text of one page, empty when the PDF has none or can't be parsed.
fn native_page_text(pdf: &Path, page: u32) -> String {
    match lopdf::Document::load(pdf) {
        Ok(doc) => doc
            .extract_text(&[page])
            .map(|text| text.trim().to_string())
            .unwrap_or_default(),
        Err(e) => {
            tracing::debug!(error = %e, "No native text available");
            String::new()
        }
    }
}

fn count_pages_with_pdfinfo(pdf: &Path) -> Result<u32, ProcessError> {
    let output = Command::new("pdfinfo").arg(pdf).output().map_err(|e| {
        ProcessError::PdfProcessing(format!(
            "Failed to run pdfinfo: {}. Make sure poppler-utils is installed.",
            e
        ))
    })?;

    if !output.status.success() {
        return Err(ProcessError::PdfProcessing(format!(
            "pdfinfo failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ProcessError::PdfProcessing("pdfinfo did not report a page count".to_string())
    })
}

fn parse_pdfinfo_pages(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|count| count.trim().parse().ok())
}

fn render_page(
    pdf: &Path,
    page: u32,
    dpi: u32,
    dir: &Path,
    basename: &str,
) -> Result<PathBuf, ProcessError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ProcessError::PdfProcessing(format!("Failed to create {}: {}", dir.display(), e))
    })?;

    let prefix = dir.join(format!("{}_source", basename));
    let page_arg = page.to_string();

    // -singlefile writes exactly `{prefix}.png`
    let output = Command::new("pdftoppm")
        .args(["-png", "-singlefile", "-r", &dpi.to_string()])
        .args(["-f", &page_arg, "-l", &page_arg])
        .arg(pdf)
        .arg(&prefix)
        .output()
        .map_err(|e| {
            ProcessError::PdfProcessing(format!(
                "Failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                e
            ))
        })?;

    if !output.status.success() {
        return Err(ProcessError::PdfProcessing(format!(
            "pdftoppm failed on page {}: {}",
            page,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    let mut image_path = prefix.into_os_string();
    image_path.push(".png");
    let image_path = PathBuf::from(image_path);
    if !image_path.exists() {
        return Err(ProcessError::PdfProcessing(format!(
            "pdftoppm produced no image for page {}",
            page
        )));
    }

    Ok(image_path)
}
