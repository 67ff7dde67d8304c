//! Status enums, figure types and page source references shared by the
//! repositories and the pipeline.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Error returned when a stored status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: ParseEnumError| FromSqlError::Other(Box::new(e)))
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// Coordinator-derived book status.
    BookStatus, "book status" {
        New => "new",
        Processing => "processing",
        Completed => "completed",
        Error => "error",
    }
);

string_enum!(
    PageStatus, "page status" {
        Pending => "pending",
        Processing => "processing",
        Processed => "processed",
        Error => "error",
    }
);

string_enum!(
    JobStatus, "job status" {
        Queued => "queued",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
);

string_enum!(
    FigureType, "figure type" {
        Table => "table",
        Chart => "chart",
        Diagram => "diagram",
        Other => "other",
    }
);

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl FigureType {
    /// Charts and diagrams are rendered as figures, everything else as tables.
    pub fn is_diagram(&self) -> bool {
        matches!(self, Self::Chart | Self::Diagram)
    }
}

/// Bounding box of a detected figure in original-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

const PDF_PAGE_MARKER: &str = "#page=";

/// Where a page's input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// A standalone uploaded image.
    Image(PathBuf),
    /// A whole uploaded PDF that has not been split yet.
    Pdf(PathBuf),
    /// One page (1-based) of an uploaded PDF.
    PdfPage { path: PathBuf, page: u32 },
}

impl PageSource {
    /// Classifies a plain path as an image or a whole PDF by extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if is_pdf_path(&path) {
            Self::Pdf(path)
        } else {
            Self::Image(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Image(path) | Self::Pdf(path) => path,
            Self::PdfPage { path, .. } => path,
        }
    }

    /// Serialized form stored in `pages.source_ref`.
    pub fn to_ref(&self) -> String {
        match self {
            Self::Image(path) | Self::Pdf(path) => path.to_string_lossy().into_owned(),
            Self::PdfPage { path, page } => {
                format!("{}{}{}", path.to_string_lossy(), PDF_PAGE_MARKER, page)
            }
        }
    }

    pub fn parse(source_ref: &str) -> Self {
        if let Some((path, page)) = source_ref.rsplit_once(PDF_PAGE_MARKER) {
            if let Ok(page) = page.parse::<u32>() {
                return Self::PdfPage {
                    path: PathBuf::from(path),
                    page,
                };
            }
        }
        Self::from_path(source_ref)
    }
}

impl fmt::Display for PageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ref())
    }
}

pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
