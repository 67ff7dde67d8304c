use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::font::{FontData, FontEncoder};
use super::{output_file_name, PdfRenderer, RenderError};
use crate::assembler::{ContentTree, Language};
use crate::config::PdfConfig;
use crate::sanitize;

// A4 in points.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const MAX_IMAGE_HEIGHT: f32 = 400.0;
const LINE_SPACING: f32 = 1.4;
const LIST_INDENT: f32 = 15.0;
const FONT_RESOURCE: &[u8] = b"F1";

/// Writes content trees as A4 PDFs with lopdf.
pub struct LopdfRenderer {
    font: Option<Arc<FontData>>,
    font_size: f32,
}

impl LopdfRenderer {
    pub fn from_config(config: &PdfConfig) -> Self {
        let font = FontData::resolve(&config.font_family, config.font_path.as_deref().map(Path::new));
        Self::with_font(font, config.font_size)
    }

    /// `None` renders with the standard Helvetica font.
    pub fn with_font(font: Option<FontData>, font_size: f32) -> Self {
        Self {
            font: font.map(Arc::new),
            font_size,
        }
    }

    pub fn has_embedded_font(&self) -> bool {
        self.font.is_some()
    }
}

impl PdfRenderer for LopdfRenderer {
    fn render_pdf(
        &self,
        tree: &ContentTree,
        language: Language,
        title: &str,
        output_dir: &Path,
    ) -> Result<PathBuf, RenderError> {
        let _span = tracing::info_span!("render_pdf", language = language.tag()).entered();

        let mut doc = Document::with_version("1.5");
        let encoder = FontEncoder::new(self.font.as_deref())?;
        let mut writer = PageWriter::new(encoder, self.font_size);

        writer.title(&sanitize::text_for_pdf(&tree.title));
        for paragraph in &tree.paragraphs {
            writer.paragraph(&sanitize::text_for_pdf(paragraph));
        }
        for figure in &tree.figures {
            let description = sanitize::text_for_pdf(&figure.description);
            writer.image(&mut doc, &figure.image_path, &description, "Figure");
        }
        for table in &tree.tables {
            let description = sanitize::text_for_pdf(&table.description);
            writer.image(&mut doc, &table.image_path, &description, "Table");
        }

        let page_count = writer.page_count();
        let bytes = writer.finish(doc)?;

        std::fs::create_dir_all(output_dir).map_err(|e| RenderError::Write {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        let path = output_dir.join(output_file_name(title, language));
        std::fs::write(&path, bytes).map_err(|e| RenderError::Write {
            path: path.clone(),
            source: e,
        })?;

        tracing::info!(
            file = %sanitize::redact_path(&path),
            pages = page_count,
            "PDF generated"
        );
        Ok(path)
    }
}

/// Lays text and images out top to bottom, starting a new page when the
/// next block does not fit.
struct PageWriter<'a> {
    encoder: FontEncoder<'a>,
    font_size: f32,
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
    images: Vec<(String, ObjectId)>,
}

impl<'a> PageWriter<'a> {
    fn new(encoder: FontEncoder<'a>, font_size: f32) -> Self {
        Self {
            encoder,
            font_size,
            pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
            images: Vec::new(),
        }
    }

    fn page_count(&self) -> usize {
        self.pages.len() + 1
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        let page_is_fresh = self.current.is_empty();
        if self.y - height < MARGIN && !page_is_fresh {
            self.new_page();
        }
    }

    fn line(&mut self, text: &str, size: f32, x: f32) {
        let leading = size * LINE_SPACING;
        self.ensure_space(leading);
        self.y -= leading;

        let operand = self.encoder.encode(text);
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT_RESOURCE.to_vec()), size.into()]),
            Operation::new("Td", vec![x.into(), self.y.into()]),
            Operation::new("Tj", vec![operand]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn title(&mut self, title: &str) {
        let size = self.font_size * 1.6;
        for line in wrap_text(&self.encoder, title.trim(), size, CONTENT_WIDTH) {
            let width = self.encoder.text_width(&line, size);
            let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
            self.line(&line, size, x);
        }
        self.y -= self.font_size * 1.5;
    }

    fn paragraph(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let is_heading = text.chars().count() < 100 && text.ends_with(':');
        let size = if is_heading {
            self.font_size * 1.25
        } else {
            self.font_size
        };
        let indent = if text.starts_with('•') || text.starts_with('-') {
            LIST_INDENT
        } else {
            0.0
        };

        for line in wrap_text(&self.encoder, text, size, CONTENT_WIDTH - indent) {
            self.line(&line, size, MARGIN + indent);
        }
        self.y -= size * 0.6;
    }

    /// Draws the image scaled to the content width with its description
    /// beneath. An unreadable image leaves only the description.
    fn image(&mut self, doc: &mut Document, path: &Path, description: &str, label: &str) {
        let (id, width, height) = match embed_image(doc, path) {
            Ok(embedded) => embedded,
            Err(e) => {
                tracing::warn!(error = %e, "Image missing from PDF, keeping description only");
                self.paragraph(&format!("[{}: {}]", label, description));
                return;
            }
        };

        let scale = (CONTENT_WIDTH / width).min(MAX_IMAGE_HEIGHT / height).min(1.0);
        let (draw_width, draw_height) = (width * scale, height * scale);
        self.ensure_space(draw_height + self.font_size * LINE_SPACING);
        self.y -= draw_height;

        let name = format!("Im{}", self.images.len() + 1);
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    draw_width.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    draw_height.into(),
                    MARGIN.into(),
                    self.y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.images.push((name, id));

        self.y -= self.font_size * 0.5;
        let caption_size = self.font_size * 0.9;
        for line in wrap_text(&self.encoder, description, caption_size, CONTENT_WIDTH) {
            self.line(&line, caption_size, MARGIN);
        }
        self.y -= self.font_size;
    }

    fn finish(mut self, mut doc: Document) -> Result<Vec<u8>, RenderError> {
        self.pages.push(std::mem::take(&mut self.current));

        let font_id = self.encoder.write_font(&mut doc);
        let mut xobjects = Dictionary::new();
        for (name, id) in &self.images {
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        });

        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let encoded = Content { operations }
                .encode()
                .map_err(|e| RenderError::Serialize(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut buf = Vec::new();
        doc.save_to(&mut buf)
            .map_err(|e| RenderError::Serialize(e.to_string()))?;
        Ok(buf)
    }
}

/// Adds the image as an RGB XObject. Returns its id and pixel size.
fn embed_image(doc: &mut Document, path: &Path) -> Result<(ObjectId, f32, f32), RenderError> {
    let image = image::open(path).map_err(|e| RenderError::Image {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(RenderError::Image {
            path: path.to_path_buf(),
            reason: "empty image".to_string(),
        });
    }

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    );
    Ok((doc.add_object(stream), width as f32, height as f32))
}

/// Greedy word wrap. Explicit newlines are kept; a word wider than the
/// line is broken between characters.
fn wrap_text(encoder: &FontEncoder<'_>, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for source_line in text.lines() {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if encoder.text_width(&candidate, size) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if encoder.text_width(word, size) <= max_width {
                current = word.to_string();
                continue;
            }

            for c in word.chars() {
                current.push(c);
                if encoder.text_width(&current, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}
