//! Font resolution and text encoding for generated PDFs.
//!
//! A TrueType font found through `fontdb` (or given as a file) is embedded
//! as a Type0/CIDFontType2 font with Identity-H encoding, so any script the
//! font covers renders. Without one, the standard Helvetica font is used and
//! characters outside Latin-1 become `?`.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId};

use super::RenderError;

/// Helvetica has no metrics table here; this is its average advance.
const STANDARD_CHAR_WIDTH: f32 = 556.0;
const STANDARD_SPACE_WIDTH: f32 = 278.0;
const MISSING_GLYPH_WIDTH: u16 = 500;

const FALLBACK_FAMILIES: [&str; 4] = ["DejaVu Sans", "Liberation Sans", "Noto Sans", "FreeSans"];

/// Raw TrueType data of the font to embed.
#[derive(Debug)]
pub struct FontData {
    pub name: String,
    bytes: Arc<Vec<u8>>,
    index: u32,
}

impl FontData {
    pub fn from_file(path: &Path) -> Result<Self, RenderError> {
        let bytes = std::fs::read(path).map_err(|e| RenderError::Font {
            name: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "EmbeddedFont".to_string());
        Self::from_bytes(&name, bytes, 0)
    }

    pub fn from_bytes(name: &str, bytes: Vec<u8>, index: u32) -> Result<Self, RenderError> {
        let face = Face::parse(&bytes, index).map_err(|e| RenderError::Font {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        if face.tables().glyf.is_none() {
            return Err(RenderError::Font {
                name: name.to_string(),
                reason: "font has no TrueType outlines".to_string(),
            });
        }

        Ok(Self {
            name: postscript_safe(name),
            bytes: Arc::new(bytes),
            index,
        })
    }

    /// Looks `family` up among the system fonts, then a few common families
    /// with Cyrillic coverage.
    pub fn from_system(family: &str) -> Option<Self> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();

        let mut candidates = vec![family];
        candidates.extend(FALLBACK_FAMILIES.iter().filter(|f| **f != family));

        for candidate in candidates {
            let families = [fontdb::Family::Name(candidate)];
            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight::NORMAL,
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };
            let Some(id) = db.query(&query) else {
                continue;
            };
            let name = db
                .face(id)
                .map(|info| info.post_script_name.clone())
                .unwrap_or_else(|| candidate.to_string());
            let loaded = db.with_face_data(id, |data, index| {
                Self::from_bytes(&name, data.to_vec(), index)
            });
            match loaded {
                Some(Ok(font)) => return Some(font),
                Some(Err(e)) => tracing::debug!(family = candidate, error = %e, "Skipping font"),
                None => {}
            }
        }
        None
    }

    /// Explicit path first, then the system lookup. `None` means the
    /// standard font will be used.
    pub fn resolve(family: &str, path: Option<&Path>) -> Option<Self> {
        if let Some(path) = path {
            match Self::from_file(path) {
                Ok(font) => return Some(font),
                Err(e) => tracing::warn!(error = %e, "Configured font unusable, searching system fonts"),
            }
        }

        let font = Self::from_system(family);
        if font.is_none() {
            tracing::warn!(family, "No TrueType font found, falling back to Helvetica");
        }
        font
    }

    fn face(&self) -> Result<Face<'_>, RenderError> {
        Face::parse(&self.bytes, self.index).map_err(|e| RenderError::Font {
            name: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

/// Measures and encodes text for one document, remembering which glyphs
/// were used so the font dictionary can describe them.
pub enum FontEncoder<'a> {
    Embedded(EmbeddedEncoder<'a>),
    Standard,
}

pub struct EmbeddedEncoder<'a> {
    font: &'a FontData,
    face: Face<'a>,
    units_per_em: f32,
    used: BTreeMap<u16, (u16, char)>,
}

impl<'a> FontEncoder<'a> {
    pub fn new(font: Option<&'a FontData>) -> Result<Self, RenderError> {
        match font {
            Some(font) => {
                let face = font.face()?;
                Ok(Self::Embedded(EmbeddedEncoder {
                    font,
                    units_per_em: f32::from(face.units_per_em().max(1)),
                    face,
                    used: BTreeMap::new(),
                }))
            }
            None => Ok(Self::Standard),
        }
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: f32 = match self {
            Self::Embedded(enc) => text
                .chars()
                .map(|c| f32::from(enc.glyph(c).1))
                .sum(),
            Self::Standard => text
                .chars()
                .map(|c| {
                    if c == ' ' {
                        STANDARD_SPACE_WIDTH
                    } else {
                        STANDARD_CHAR_WIDTH
                    }
                })
                .sum(),
        };
        units * size / 1000.0
    }

    /// The string operand of a `Tj` operator.
    pub fn encode(&mut self, text: &str) -> Object {
        match self {
            Self::Embedded(enc) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let (gid, width) = enc.glyph(c);
                    if gid != 0 {
                        enc.used.entry(gid).or_insert((width, c));
                    }
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                Object::String(bytes, StringFormat::Hexadecimal)
            }
            Self::Standard => {
                let bytes: Vec<u8> = text
                    .chars()
                    .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                    .collect();
                Object::String(bytes, StringFormat::Literal)
            }
        }
    }

    /// Adds the font objects to `doc` and returns the id of the font
    /// dictionary referenced from page resources.
    pub fn write_font(&self, doc: &mut Document) -> ObjectId {
        match self {
            Self::Embedded(enc) => enc.write_font(doc),
            Self::Standard => doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
        }
    }
}

impl EmbeddedEncoder<'_> {
    /// Glyph id and width in thousandths of an em. Unmapped characters map
    /// to glyph 0.
    fn glyph(&self, c: char) -> (u16, u16) {
        let Some(gid) = self.face.glyph_index(c) else {
            return (0, MISSING_GLYPH_WIDTH);
        };
        let width = self
            .face
            .glyph_hor_advance(gid)
            .map(|advance| self.to_pdf_units(f32::from(advance)) as u16)
            .unwrap_or(MISSING_GLYPH_WIDTH);
        (gid.0, width)
    }

    fn to_pdf_units(&self, value: f32) -> f32 {
        value * 1000.0 / self.units_per_em
    }

    fn write_font(&self, doc: &mut Document) -> ObjectId {
        let font_file = Stream::new(
            dictionary! { "Length1" => self.font.bytes.len() as i64 },
            self.font.bytes.to_vec(),
        );
        let font_file_id = doc.add_object(font_file);

        let bbox = self.face.global_bounding_box();
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.font.name.clone().into_bytes()),
            "Flags" => 32,
            "FontBBox" => vec![
                Object::Integer(self.to_pdf_units(f32::from(bbox.x_min)) as i64),
                Object::Integer(self.to_pdf_units(f32::from(bbox.y_min)) as i64),
                Object::Integer(self.to_pdf_units(f32::from(bbox.x_max)) as i64),
                Object::Integer(self.to_pdf_units(f32::from(bbox.y_max)) as i64),
            ],
            "ItalicAngle" => 0,
            "Ascent" => self.to_pdf_units(f32::from(self.face.ascender())) as i64,
            "Descent" => self.to_pdf_units(f32::from(self.face.descender())) as i64,
            "CapHeight" => self
                .face
                .capital_height()
                .map(|h| self.to_pdf_units(f32::from(h)) as i64)
                .unwrap_or(700),
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for (gid, (width, _)) in &self.used {
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Integer(i64::from(*width))]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.font.name.clone().into_bytes()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => i64::from(MISSING_GLYPH_WIDTH),
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            to_unicode_cmap(&self.used).into_bytes(),
        ));

        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(self.font.name.clone().into_bytes()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        })
    }
}

/// ToUnicode CMap mapping each used glyph back to its character.
fn to_unicode_cmap(used: &BTreeMap<u16, (u16, char)>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(u16, char)> = used.iter().map(|(gid, (_, c))| (*gid, *c)).collect();
    // At most 100 entries per bfchar block.
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

/// PDF names must not contain whitespace or delimiters.
fn postscript_safe(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        cleaned
    }
}
